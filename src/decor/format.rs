use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::decor::size::{render_size, FormatSize};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("format has no verb, expected something like \"%.1f\"")]
    MissingVerb,
    #[error("format has more than one verb")]
    TooManyVerbs,
    #[error("unsupported verb '%{0}', expected one of f, F, d, v, s, g")]
    UnknownVerb(char),
    #[error("format ends in the middle of a verb")]
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Fixed,
    Integer,
    Shortest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    space: bool,
    plus: bool,
    minus: bool,
    zero: bool,
}

/// A printf-style format holding exactly one numeric verb, e.g. `"%.1f"` or
/// `"speed: % .0f"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumFormat {
    prefix: String,
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    verb: Verb,
    suffix: String,
}

impl NumFormat {
    pub fn parse(fmt: &str) -> Result<Self, FormatError> {
        let mut chars = fmt.chars().peekable();
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec: Option<(Flags, Option<usize>, Option<usize>, Verb)> = None;

        while let Some(c) = chars.next() {
            let out = if spec.is_some() { &mut suffix } else { &mut prefix };
            if c != '%' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }
            if spec.is_some() {
                return Err(FormatError::TooManyVerbs);
            }
            spec = Some(parse_verb(&mut chars)?);
        }

        let (flags, width, precision, verb) = spec.ok_or(FormatError::MissingVerb)?;
        Ok(Self { prefix, flags, width, precision, verb, suffix })
    }

    /// Renders a plain number honoring sign, padding and precision flags.
    pub fn format_number(&self, value: f64) -> String {
        let value = match self.verb {
            Verb::Integer => value.round(),
            _ => value,
        };
        let magnitude = value.abs();
        let body = match self.verb {
            Verb::Fixed => format!("{:.*}", self.precision.unwrap_or(6), magnitude),
            Verb::Integer => format!("{magnitude:.0}"),
            Verb::Shortest => format!("{magnitude}"),
        };
        let sign = if value < 0.0 {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        };

        let len = sign.chars().count() + body.chars().count();
        let pad = self.width.unwrap_or(0).saturating_sub(len);
        let padded = if self.flags.minus {
            format!("{sign}{body}{}", " ".repeat(pad))
        } else if self.flags.zero {
            format!("{sign}{}{body}", "0".repeat(pad))
        } else {
            format!("{}{sign}{body}", " ".repeat(pad))
        };
        self.wrap(&padded)
    }

    /// Renders a scaled size value. The space flag separates number and unit,
    /// width and `-` pad the `number unit` text and the size's suffix follows.
    pub fn format_size(&self, size: &impl FormatSize) -> String {
        let decimals = match self.verb {
            Verb::Integer => Some(0),
            Verb::Shortest => None,
            Verb::Fixed => Some(self.precision.unwrap_or(6)),
        };
        let text = render_size(size, decimals, self.flags.space);

        let pad = self.width.unwrap_or(0).saturating_sub(text.chars().count());
        let mut padded = if self.flags.minus {
            format!("{text}{}", " ".repeat(pad))
        } else {
            format!("{}{text}", " ".repeat(pad))
        };
        padded.push_str(size.suffix());
        self.wrap(&padded)
    }

    fn wrap(&self, value: &str) -> String {
        format!("{}{value}{}", self.prefix, self.suffix)
    }
}

fn parse_verb(chars: &mut Peekable<Chars<'_>>) -> Result<(Flags, Option<usize>, Option<usize>, Verb), FormatError> {
    let mut flags = Flags::default();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' => flags.space = true,
            '+' => flags.plus = true,
            '-' => flags.minus = true,
            '0' => flags.zero = true,
            _ => break,
        }
        chars.next();
    }

    let width = parse_digits(chars);
    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        // "%.f" means precision 0
        Some(parse_digits(chars).unwrap_or(0))
    } else {
        None
    };

    let verb = match chars.next() {
        None => return Err(FormatError::Truncated),
        Some('f' | 'F') => Verb::Fixed,
        Some('d') => Verb::Integer,
        Some('v' | 's' | 'g') => Verb::Shortest,
        Some(other) => return Err(FormatError::UnknownVerb(other)),
    };
    Ok((flags, width, precision, verb))
}

fn parse_digits(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::size::{PerSecond, SizeB1000, SizeB1024};

    #[test]
    fn parses_prefix_and_suffix() {
        let f = NumFormat::parse("rate: %.2f items (100%%)").unwrap();
        assert_eq!(f.format_number(1.5), "rate: 1.50 items (100%)");
    }

    #[test]
    fn fixed_defaults_to_six_digits() {
        let f = NumFormat::parse("%f").unwrap();
        assert_eq!(f.format_number(2.0), "2.000000");
    }

    #[test]
    fn number_flags() {
        assert_eq!(NumFormat::parse("% .1f").unwrap().format_number(5.0), " 5.0");
        assert_eq!(NumFormat::parse("%+.0f").unwrap().format_number(5.0), "+5");
        assert_eq!(NumFormat::parse("%6.1f").unwrap().format_number(-5.0), "  -5.0");
        assert_eq!(NumFormat::parse("%-6.1f|").unwrap().format_number(5.0), "5.0   |");
        assert_eq!(NumFormat::parse("%06.1f").unwrap().format_number(-5.0), "-005.0");
    }

    #[test]
    fn integer_verb_rounds() {
        let f = NumFormat::parse("%d").unwrap();
        assert_eq!(f.format_number(2.5), "3");
        assert_eq!(f.format_number(-0.2), "0");
    }

    #[test]
    fn shortest_verb() {
        let f = NumFormat::parse("%v").unwrap();
        assert_eq!(f.format_number(0.25), "0.25");
        assert_eq!(f.format_number(1024.0), "1024");
    }

    #[test]
    fn size_spacing_follows_space_flag() {
        let tight = NumFormat::parse("%.1f").unwrap();
        let spaced = NumFormat::parse("% .1f").unwrap();
        assert_eq!(tight.format_size(&PerSecond(SizeB1024(1_048_576))), "1.0MiB/s");
        assert_eq!(spaced.format_size(&PerSecond(SizeB1024(1_048_576))), "1.0 MiB/s");
        assert_eq!(tight.format_size(&PerSecond(SizeB1000(1_000_000))), "1.0MB/s");
        assert_eq!(spaced.format_size(&PerSecond(SizeB1000(1_000_000))), "1.0 MB/s");
    }

    #[test]
    fn size_width_excludes_per_second_suffix() {
        let right = NumFormat::parse("%10.1f").unwrap();
        let left = NumFormat::parse("%-10.1f").unwrap();
        assert_eq!(right.format_size(&SizeB1024(2048)), "    2.0KiB");
        assert_eq!(right.format_size(&PerSecond(SizeB1024(2048))), "    2.0KiB/s");
        assert_eq!(left.format_size(&PerSecond(SizeB1024(2048))), "2.0KiB    /s");
    }

    #[test]
    fn size_integer_and_shortest_verbs() {
        assert_eq!(NumFormat::parse("%d").unwrap().format_size(&SizeB1024(1536)), "2KiB");
        assert_eq!(NumFormat::parse("%v").unwrap().format_size(&SizeB1024(2048)), "2KiB");
        assert_eq!(NumFormat::parse("%v").unwrap().format_size(&SizeB1024(1536)), "1.50KiB");
    }

    #[test]
    fn rejects_malformed_formats() {
        assert_eq!(NumFormat::parse(""), Err(FormatError::MissingVerb));
        assert_eq!(NumFormat::parse("speed 100%%"), Err(FormatError::MissingVerb));
        assert_eq!(NumFormat::parse("%.1f %.1f"), Err(FormatError::TooManyVerbs));
        assert_eq!(NumFormat::parse("%x"), Err(FormatError::UnknownVerb('x')));
        assert_eq!(NumFormat::parse("%.1"), Err(FormatError::Truncated));
    }
}
