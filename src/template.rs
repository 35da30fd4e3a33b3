//! Single-slot action templates
//!
//! Binding actions are raw obs-websocket messages with exactly one printf
//! style slot, e.g. `{"request-type":"SetVolume","source":"Mic","volume":%s}`.
//! A slot is `%[flags][width][.precision]conversion` with flags from
//! `-0+ #` and conversions `s`, `d`, `i`, `u`, `f` and `F`; `%%` is a literal
//! percent sign.

use thiserror::Error;

/// Value substituted into a template slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotValue<'a> {
    Float(f64),
    Int(i64),
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template must contain exactly one slot, found {0}")]
    SlotCount(usize),

    #[error("unsupported conversion '%{0}' in template")]
    Unsupported(char),

    #[error("unterminated slot at end of template")]
    Unterminated,

    #[error("conversion '%{conversion}' cannot format text value '{value}'")]
    NotNumeric { conversion: char, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Conversion {
    Str,
    Int,
    Fixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alternate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
    symbol: char,
}

enum Piece<'t> {
    Literal(&'t str),
    Percent,
    Slot(Slot),
}

const DEFAULT_PRECISION: usize = 6;

/// Length of the leading run of ASCII digits in `s`
fn digit_run(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Parse the directive following a `%`; returns the piece and bytes consumed
fn parse_directive(spec: &str) -> Result<(Piece<'static>, usize), TemplateError> {
    let mut flags = Flags::default();
    let mut i = 0;
    for b in spec.bytes() {
        match b {
            b'-' => flags.left = true,
            b'0' => flags.zero = true,
            b'+' => flags.plus = true,
            b' ' => flags.space = true,
            b'#' => flags.alternate = true,
            _ => break,
        }
        i += 1;
    }

    let width_len = digit_run(&spec[i..]);
    let width = match &spec[i..i + width_len] {
        "" => 0,
        digits => digits
            .parse::<usize>()
            .map_err(|_| TemplateError::Unsupported(spec[i..].chars().next().unwrap_or('0')))?,
    };
    i += width_len;

    let mut precision = None;
    if spec[i..].starts_with('.') {
        i += 1;
        let precision_len = digit_run(&spec[i..]);
        precision = Some(match &spec[i..i + precision_len] {
            "" => 0,
            digits => digits
                .parse::<usize>()
                .map_err(|_| TemplateError::Unsupported('.'))?,
        });
        i += precision_len;
    }

    let symbol = spec[i..].chars().next().ok_or(TemplateError::Unterminated)?;
    i += symbol.len_utf8();

    let conversion = match symbol {
        '%' => return Ok((Piece::Percent, i)),
        's' => Conversion::Str,
        'd' | 'i' | 'u' => Conversion::Int,
        'f' | 'F' => Conversion::Fixed,
        other => return Err(TemplateError::Unsupported(other)),
    };

    let slot = Slot {
        flags,
        width,
        precision,
        conversion,
        symbol,
    };
    Ok((Piece::Slot(slot), i))
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        if pos > 0 {
            pieces.push(Piece::Literal(&rest[..pos]));
        }
        let (piece, consumed) = parse_directive(&rest[pos + 1..])?;
        pieces.push(piece);
        rest = &rest[pos + 1 + consumed..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    Ok(pieces)
}

/// Render a float the way a `%s` slot expects: integral values keep a `.0`.
fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn sign(negative: bool, flags: Flags) -> &'static str {
    if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    }
}

/// Pad `sign + body` to the slot width
fn pad(slot: &Slot, sign: &str, body: &str, numeric: bool) -> String {
    let len = sign.chars().count() + body.chars().count();
    let fill = slot.width.saturating_sub(len);
    if fill == 0 {
        return format!("{}{}", sign, body);
    }

    if slot.flags.left {
        format!("{}{}{}", sign, body, " ".repeat(fill))
    } else if slot.flags.zero && numeric {
        format!("{}{}{}", sign, "0".repeat(fill), body)
    } else {
        format!("{}{}{}", " ".repeat(fill), sign, body)
    }
}

fn render(slot: &Slot, value: SlotValue<'_>) -> Result<String, TemplateError> {
    let not_numeric = |text: &str| TemplateError::NotNumeric {
        conversion: slot.symbol,
        value: text.to_string(),
    };

    let text = match slot.conversion {
        Conversion::Str => {
            let text = match value {
                SlotValue::Float(v) => float_text(v),
                SlotValue::Int(v) => v.to_string(),
                SlotValue::Text(t) => t.to_string(),
            };
            let body = match slot.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            pad(slot, "", &body, false)
        }
        Conversion::Int => {
            let n = match value {
                SlotValue::Float(v) => v.trunc() as i64,
                SlotValue::Int(v) => v,
                SlotValue::Text(t) => return Err(not_numeric(t)),
            };
            let digits = n.unsigned_abs().to_string();
            let body = match slot.precision {
                Some(p) if p > digits.len() => format!("{}{}", "0".repeat(p - digits.len()), digits),
                _ => digits,
            };
            pad(slot, sign(n < 0, slot.flags), &body, true)
        }
        Conversion::Fixed => {
            let v = match value {
                SlotValue::Float(v) => v,
                SlotValue::Int(v) => v as f64,
                SlotValue::Text(t) => return Err(not_numeric(t)),
            };
            let precision = slot.precision.unwrap_or(DEFAULT_PRECISION);
            let mut body = format!("{:.*}", precision, v.abs());
            if slot.flags.alternate && precision == 0 {
                body.push('.');
            }
            pad(slot, sign(v.is_sign_negative(), slot.flags), &body, true)
        }
    };
    Ok(text)
}

fn single_slot(pieces: &[Piece<'_>]) -> Result<(), TemplateError> {
    let slots = pieces.iter().filter(|p| matches!(p, Piece::Slot(_))).count();
    if slots != 1 {
        return Err(TemplateError::SlotCount(slots));
    }
    Ok(())
}

/// Check that `template` has exactly one well-formed slot
pub fn check(template: &str) -> Result<(), TemplateError> {
    single_slot(&parse(template)?)
}

/// Substitute `value` into the single slot of `template`
pub fn fill(template: &str, value: SlotValue<'_>) -> Result<String, TemplateError> {
    let pieces = parse(template)?;
    single_slot(&pieces)?;

    let mut out = String::with_capacity(template.len() + 16);
    for piece in pieces {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Percent => out.push('%'),
            Piece::Slot(slot) => out.push_str(&render(&slot, value)?),
        }
    }
    Ok(out)
}
