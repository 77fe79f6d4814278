use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    str::FromStr,
    sync::Mutex,
};

use chrono::Local;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn tag(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DBG",
            LogLevel::Info => "INF",
            LogLevel::Warn => "WAR",
            LogLevel::Error => "ERR",
        }
    }

    fn colored_tag(&self) -> ColoredString {
        match self {
            LogLevel::Debug => self.tag().bright_cyan(),
            LogLevel::Info => self.tag().bright_green(),
            LogLevel::Warn => self.tag().yellow(),
            LogLevel::Error => self.tag().bright_red(),
        }
    }

    /// Whether a message at `message` level is shown when the logger is
    /// configured at `self`.
    pub fn shows(&self, message: &LogLevel) -> bool {
        let rank = |l: &LogLevel| match l {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warn => 2,
            LogLevel::Error => 3,
        };
        rank(message) >= rank(self)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "info" | "inf" => Ok(LogLevel::Info),
            "warn" | "warning" | "war" => Ok(LogLevel::Warn),
            "error" | "err" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "Debug"),
            LogLevel::Info => write!(f, "Info"),
            LogLevel::Warn => write!(f, "Warn"),
            LogLevel::Error => write!(f, "Error"),
        }
    }
}

/// Console logger with an optional plain-text file sink. Console output is
/// colored; the file receives the same lines without color codes.
#[derive(Debug)]
pub struct Logger {
    level: LogLevel,
    name: String,
    file: Option<Mutex<BufWriter<File>>>,
}

impl Logger {
    pub fn new(level: LogLevel, name: String, log_file_path: Option<String>) -> Self {
        let file = log_file_path.map(|path| {
            let file = File::create(path).expect("failed to create log file");
            Mutex::new(BufWriter::new(file))
        });

        Logger { level, name, file }
    }

    /// A logger writing to `./logs/<name>_<timestamp>.txt` next to the
    /// console.
    pub fn with_timestamped_file(level: LogLevel, name: String) -> Self {
        let _ = std::fs::create_dir_all("./logs");
        let path = format!(
            "./logs/{}_{}.txt",
            name,
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        Logger::new(level, name, Some(path))
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.write_to_file(&format!("[{}] {}: {}", level.tag(), self.name, message));

        if self.level.shows(&level) {
            eprintln!(
                "[{}] {} {}",
                level.colored_tag(),
                format!("{}:", self.name).dimmed(),
                message
            );
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn empty(&self, level: LogLevel) {
        self.write_to_file("");
        if self.level.shows(&level) {
            eprintln!();
        }
    }

    fn write_to_file(&self, line: &str) {
        if let Some(file) = &self.file {
            let mut f = file.lock().unwrap();
            let _ = f.write_all(line.as_bytes());
            let _ = f.write_all(b"\n");
        }
    }

    pub fn object<'a>(&'a self, name: &'a str) -> ObjectBuilder<'a> {
        ObjectBuilder::new(name, self)
    }
}

/// Builds a structured multi-line log record field by field.
#[derive(Debug, Clone)]
pub struct ObjectBuilder<'a> {
    logger: &'a Logger,
    name: &'a str,
    fields: Vec<(&'a str, String)>,
}

impl<'a> ObjectBuilder<'a> {
    fn new(name: &'a str, logger: &'a Logger) -> Self {
        ObjectBuilder {
            logger,
            name,
            fields: vec![],
        }
    }

    pub fn add_field(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn log(&self, level: LogLevel) {
        let mut record = format!("{} {{", self.name);
        for (name, value) in &self.fields {
            record.push_str(&format!("\n  {}: {}", name, value));
        }
        record.push_str("\n}");
        self.logger.log(level, &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filtering() {
        assert!(LogLevel::Info.shows(&LogLevel::Warn));
        assert!(LogLevel::Info.shows(&LogLevel::Info));
        assert!(!LogLevel::Info.shows(&LogLevel::Debug));
        assert!(LogLevel::Error.shows(&LogLevel::Error));
        assert!(!LogLevel::Error.shows(&LogLevel::Warn));
    }

    #[test]
    fn level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
