//! Quote stripping and escape tables for every string style.

use crate::ast::QuoteStyle;

/// Split a raw string token into its unescaped value and quote style.
pub fn string_value(raw: &str) -> Option<(String, QuoteStyle)> {
    let style = QuoteStyle::from_delimiter(raw)?;
    let delim = style.delimiter();
    let body = raw.strip_prefix(delim)?.strip_suffix(delim)?;
    Some((unescape(body, style), style))
}

/// Replace escape sequences in a string body written in `style`.
///
/// Triple-quoted and slashy bodies may span lines; carriage returns are dropped first.
pub fn unescape(body: &str, style: QuoteStyle) -> String {
    let normalized;
    let body = match style {
        QuoteStyle::TripleSingle | QuoteStyle::TripleDouble | QuoteStyle::Slashy if body.contains('\r') => {
            normalized = body.replace('\r', "");
            normalized.as_str()
        }
        _ => body,
    };
    if !body.contains('\\') {
        return body.to_string();
    }
    if style == QuoteStyle::Slashy {
        return body.replace("\\/", "/");
    }

    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 == chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        let replacement = match next {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            '$' => Some('$'),
            _ => None,
        };
        if let Some(r) = replacement {
            out.push(r);
            i += 2;
            continue;
        }
        if next == 'u'
            && let Some(decoded) = decode_unicode(&chars[i + 2..])
        {
            out.push(decoded);
            i += 6;
            continue;
        }
        if next == '\n' && matches!(style, QuoteStyle::TripleSingle | QuoteStyle::TripleDouble) {
            // line continuation
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn decode_unicode(rest: &[char]) -> Option<char> {
    if rest.len() < 4 {
        return None;
    }
    let hex: String = rest[..4].iter().collect();
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}

/// Whether `text` can be written between slashes and read back unchanged.
///
/// Slashy bodies have no escapes for `$`, carriage returns or a final backslash, and `//` opens a comment.
pub fn slashy_representable(text: &str) -> bool {
    !text.is_empty() && !text.ends_with('\\') && !text.contains(['$', '\r'])
}

/// Inverse of [`unescape`]: `unescape(&escape(s, style), style) == s`.
pub fn escape(text: &str, style: QuoteStyle) -> String {
    let mut out = String::with_capacity(text.len());
    if style == QuoteStyle::Slashy {
        for c in text.chars() {
            if c == '/' {
                out.push('\\');
            }
            out.push(c);
        }
        return out;
    }
    let triple = matches!(style, QuoteStyle::TripleSingle | QuoteStyle::TripleDouble);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' if matches!(style, QuoteStyle::Single | QuoteStyle::TripleSingle) => out.push_str("\\'"),
            '"' if matches!(style, QuoteStyle::Double | QuoteStyle::TripleDouble) => out.push_str("\\\""),
            '$' if style.interpolates() => out.push_str("\\$"),
            '\n' if !triple => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' if !triple => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
    out
}
