/// Textual representation of an SPN, readable enough to write nets by hand.
///
/// An example:
///
/// ```text
/// places
///     p1 p2 p3
/// transitions
///     p1 -> p2 @ 2;
///     p2 p3 -> p1 @ 1;
///     -> p3 @ 0.5;
/// marking
///     p1=1, p3=2
/// ```
///
/// Every transition consumes one token from each place left of `->`,
/// produces one token in each place right of it, and fires with the rate
/// after `@`. A side may be empty. Places missing from the marking section
/// hold zero tokens.
use std::path::Path;

use nom::{bytes::complete::tag, character::complete::space1, error::ParseError};

use crate::spn::{FiringRates, SpnMatrix};

fn integer<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, u32, E> {
    let (input, num_str) = nom::character::complete::digit1(input)?;
    let num = num_str.parse::<u32>().unwrap();
    Ok((input, num))
}

fn rate<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, f64, E> {
    let (input, whole) = nom::character::complete::digit1(input)?;
    let (input, frac) = nom::combinator::opt(nom::sequence::preceded(
        tag("."),
        nom::character::complete::digit1,
    ))(input)?;

    let text = match frac {
        Some(frac) => format!("{}.{}", whole, frac),
        None => whole.to_string(),
    };
    Ok((input, text.parse::<f64>().unwrap()))
}

fn opt_whitespace<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, &'a str, E> {
    nom::character::complete::multispace0(input)
}

fn whitespace<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, &'a str, E> {
    nom::character::complete::multispace1(input)
}

fn separator<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, (), E> {
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag(",")(input)?;
    let (input, _) = opt_whitespace(input)?;
    Ok((input, ()))
}

fn place_name<'a, E: ParseError<&'a str>>(input: &'a str) -> nom::IResult<&'a str, &'a str, E> {
    let (input2, (first, rest)) = nom::sequence::pair(
        nom::character::complete::alpha1,
        nom::character::complete::alphanumeric0,
    )(input)?;

    Ok((input2, &input[..first.len() + rest.len()]))
}

fn place_list<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, Vec<&'a str>, E> {
    nom::multi::separated_list1(space1, place_name)(input)
}

#[test]
fn test_place_list_1() {
    let input = "p1 p2 abc3";
    let (_, places) = place_list::<nom::error::Error<&str>>(input).unwrap();
    assert_eq!(places, vec!["p1", "p2", "abc3"]);
}

#[derive(Debug, Clone)]
pub struct TransitionText<'a> {
    pub inputs: Vec<&'a str>,
    pub outputs: Vec<&'a str>,
    pub rate: f64,
}

fn transition<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, TransitionText<'a>, E> {
    let (input, inputs) = nom::combinator::opt(place_list)(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("->")(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, outputs) = nom::combinator::opt(place_list)(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("@")(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, rate) = rate(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag(";")(input)?;

    Ok((
        input,
        TransitionText {
            inputs: inputs.unwrap_or_default(),
            outputs: outputs.unwrap_or_default(),
            rate,
        },
    ))
}

#[test]
fn test_transition_1() {
    let input = "p1 p2 -> p3 @ 2;";
    let (_, t) = transition::<nom::error::Error<&str>>(input).unwrap();
    assert_eq!(t.inputs, vec!["p1", "p2"]);
    assert_eq!(t.outputs, vec!["p3"]);
    assert_eq!(t.rate, 2.0);
}

#[test]
fn test_transition_2() {
    // a source transition with no inputs and a fractional rate
    let input = "-> p1 @ 0.5;";
    let (_, t) = transition::<nom::error::Error<&str>>(input).unwrap();
    assert!(t.inputs.is_empty());
    assert_eq!(t.outputs, vec!["p1"]);
    assert_eq!(t.rate, 0.5);
}

fn marking_atom<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, (&'a str, u32), E> {
    let (input, place) = place_name(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("=")(input)?;
    let (input, _) = opt_whitespace(input)?;
    let (input, tokens) = integer(input)?;

    Ok((input, (place, tokens)))
}

#[test]
fn test_marking_atom_1() {
    let input = "p2 = 3";
    let (_, atom) = marking_atom::<nom::error::Error<&str>>(input).unwrap();
    assert_eq!(atom, ("p2", 3));
}

fn places_section<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, Vec<&'a str>, E> {
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("places")(input)?;
    let (input, _) = whitespace(input)?;

    place_list(input)
}

fn transitions_section<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, Vec<TransitionText<'a>>, E> {
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("transitions")(input)?;
    let (input, _) = whitespace(input)?;

    nom::multi::separated_list1(opt_whitespace, transition)(input)
}

fn marking_section<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> nom::IResult<&'a str, Vec<(&'a str, u32)>, E> {
    let (input, _) = opt_whitespace(input)?;
    let (input, _) = tag("marking")(input)?;
    let (input, _) = whitespace(input)?;

    nom::multi::separated_list1(separator, marking_atom)(input)
}

/// Parsed but not yet validated form of the text format.
#[derive(Debug, Clone)]
pub struct SpnText<'a> {
    pub places: Vec<&'a str>,
    pub transitions: Vec<TransitionText<'a>>,
    pub marking: Vec<(&'a str, u32)>,
}

impl<'a> SpnText<'a> {
    fn p(input: &'a str) -> nom::IResult<&'a str, SpnText<'a>, nom::error::Error<&'a str>> {
        let (input, places) = places_section(input)?;
        let (input, transitions) = transitions_section(input)?;
        let (input, marking) = marking_section(input)?;
        let (input, _) = opt_whitespace(input)?;

        Ok((
            input,
            SpnText {
                places,
                transitions,
                marking,
            },
        ))
    }

    pub fn parse(input: &'a str) -> anyhow::Result<SpnText<'a>> {
        match Self::p(input) {
            Ok((_, text)) => Ok(text),
            Err(e) => Err(anyhow::anyhow!("failed to parse SPN text: {}", e)),
        }
    }

    pub fn to_net(&self) -> anyhow::Result<(SpnMatrix, FiringRates)> {
        let mut matrix = SpnMatrix::new(self.places.len(), self.transitions.len());
        let mut rates = Vec::with_capacity(self.transitions.len());

        let position = |name: &str| -> anyhow::Result<usize> {
            self.places
                .iter()
                .position(|&p| p == name)
                .ok_or_else(|| anyhow::anyhow!("place '{}' is not declared", name))
        };

        for (t, transition) in self.transitions.iter().enumerate() {
            for input in &transition.inputs {
                matrix.set_tin(position(input)?, t, 1);
            }
            for output in &transition.outputs {
                matrix.set_tout(position(output)?, t, 1);
            }
            if transition.rate <= 0.0 {
                anyhow::bail!("transition {} has non-positive rate {}", t, transition.rate);
            }
            rates.push(transition.rate);
        }

        for (place, tokens) in &self.marking {
            matrix.set_m0(position(place)?, *tokens);
        }

        Ok((matrix, FiringRates::from(rates)))
    }
}

/// Parses the text format into a validated net.
pub fn parse_text(input: &str) -> anyhow::Result<(SpnMatrix, FiringRates)> {
    SpnText::parse(input)?.to_net()
}

/// Writes a net in the text format. Parsing the output yields the same net.
pub fn to_text_format(matrix: &SpnMatrix, rates: &FiringRates) -> String {
    let mut out = String::new();
    let name = |p: usize| format!("p{}", p + 1);

    out.push_str("places\n    ");
    let places = (0..matrix.place_count())
        .map(name)
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&places);
    out.push('\n');

    out.push_str("transitions\n");
    for t in 0..matrix.transition_count() {
        out.push_str("    ");

        let inputs = (0..matrix.place_count())
            .filter(|&p| matrix.tin(p, t) == 1)
            .map(name)
            .collect::<Vec<_>>();
        if !inputs.is_empty() {
            out.push_str(&inputs.join(" "));
            out.push(' ');
        }
        out.push_str("-> ");

        let outputs = (0..matrix.place_count())
            .filter(|&p| matrix.tout(p, t) == 1)
            .map(name)
            .collect::<Vec<_>>();
        if !outputs.is_empty() {
            out.push_str(&outputs.join(" "));
            out.push(' ');
        }

        let r = rates.rate(t);
        if r.fract() == 0.0 {
            out.push_str(&format!("@ {};\n", r as u64));
        } else {
            out.push_str(&format!("@ {};\n", r));
        }
    }

    out.push_str("marking\n    ");
    let marking = (0..matrix.place_count())
        .filter(|&p| matrix.m0(p) > 0)
        .map(|p| format!("{}={}", name(p), matrix.m0(p)))
        .collect::<Vec<_>>();
    if marking.is_empty() {
        out.push_str(&format!("{}=0", name(0)));
    } else {
        out.push_str(&marking.join(", "));
    }
    out.push('\n');

    out
}

/// Loads a net from a `.spn` text file or a `.json` matrix file. JSON files
/// carry no rates, so those default to one per transition.
pub fn load_net_from_file(path: &str) -> anyhow::Result<(SpnMatrix, FiringRates)> {
    let extension = Path::new(path).extension().and_then(|e| e.to_str());
    match extension {
        Some("spn") => {
            let content = std::fs::read_to_string(path)?;
            parse_text(&content)
        }
        Some("json") => {
            let matrix = SpnMatrix::from_file(path)?;
            let rates = FiringRates::uniform(matrix.transition_count());
            Ok((matrix, rates))
        }
        _ => Err(anyhow::anyhow!("unsupported file extension: {:?}", extension)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_producer_consumer() {
        let input = r#"
        places
            p1 p2
        transitions
            p1 -> p2 @ 2;
            p2 -> p1 @ 3;
        marking
            p1=1"#;

        let (matrix, rates) = parse_text(input).unwrap();

        assert_eq!(matrix.place_count(), 2);
        assert_eq!(matrix.transition_count(), 2);
        assert_eq!(matrix.tin(0, 0), 1);
        assert_eq!(matrix.tout(1, 0), 1);
        assert_eq!(matrix.m0(0), 1);
        assert_eq!(matrix.m0(1), 0);
        assert_eq!(rates.rate(0), 2.0);
        assert_eq!(rates.rate(1), 3.0);
    }

    #[test]
    fn undeclared_place_is_an_error() {
        let input = r#"
        places
            p1
        transitions
            p1 -> p9 @ 1;
        marking
            p1=1"#;

        assert!(parse_text(input).is_err());
    }

    #[test]
    fn zero_rate_is_an_error() {
        let input = r#"
        places
            p1 p2
        transitions
            p1 -> p2 @ 0;
        marking
            p1=1"#;

        assert!(parse_text(input).is_err());
    }

    #[test]
    fn stringify_and_parse() {
        let matrix =
            SpnMatrix::from_rows(vec![vec![1, 0, 0, 1, 1], vec![0, 1, 1, 0, 0]]).unwrap();
        let rates = FiringRates::from(vec![2.0, 0.5]);

        let text = to_text_format(&matrix, &rates);
        let (parsed_matrix, parsed_rates) = parse_text(&text).unwrap();

        assert_eq!(parsed_matrix, matrix);
        assert_eq!(parsed_rates, rates);
    }

    #[test]
    fn source_transitions_round_trip() {
        let mut matrix = SpnMatrix::new(2, 2);
        matrix.set_tout(0, 0, 1); // source into p1
        matrix.set_tin(0, 1, 1); // sink out of p1
        matrix.set_m0(1, 3);
        let rates = FiringRates::from(vec![1.0, 4.0]);

        let text = to_text_format(&matrix, &rates);
        let (parsed_matrix, parsed_rates) = parse_text(&text).unwrap();

        assert_eq!(parsed_matrix, matrix);
        assert_eq!(parsed_rates, rates);
    }
}
