//! HTML character reference decoding for template text.

/// Named references understood in template text.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("hellip", '…'),
    ("mdash", '—'),
    ("ndash", '–'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("bull", '•'),
    ("middot", '·'),
    ("times", '×'),
    ("divide", '÷'),
    ("deg", '°'),
    ("euro", '€'),
    ("pound", '£'),
    ("yen", '¥'),
    ("cent", '¢'),
    ("sect", '§'),
    ("para", '¶'),
    ("shy", '\u{ad}'),
    ("auml", 'ä'),
    ("ouml", 'ö'),
    ("uuml", 'ü'),
    ("Auml", 'Ä'),
    ("Ouml", 'Ö'),
    ("Uuml", 'Ü'),
    ("szlig", 'ß'),
];

/// Longest reference body we look for (`&` and `;` excluded).
const MAX_REFERENCE: usize = 10;

fn numeric(body: &str) -> Option<char> {
    let code = match body.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => body.parse::<u32>().ok()?,
    };
    match code {
        0 => Some('\u{fffd}'),
        code => Some(char::from_u32(code).unwrap_or('\u{fffd}')),
    }
}

fn reference(body: &str) -> Option<char> {
    if let Some(number) = body.strip_prefix('#') {
        return numeric(number);
    }
    NAMED.iter().find(|(name, _)| *name == body).map(|(_, c)| *c)
}

/// Replace `&name;`, `&#NN;` and `&#xHH;` references in `text`. Unknown or
/// unterminated references are kept verbatim.
pub fn decode(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_REFERENCE)
            .and_then(|end| reference(&after[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_references() {
        assert_eq!(decode("a &lt;b&gt; &amp; &quot;c&quot;"), "a <b> & \"c\"");
        assert_eq!(decode("x&nbsp;y"), "x\u{a0}y");
        assert_eq!(decode("&#39;"), "'");
    }

    #[test]
    fn numeric_references() {
        assert_eq!(decode("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode("&#0;"), "\u{fffd}");
        assert_eq!(decode("&#xD800;"), "\u{fffd}");
    }

    #[test]
    fn unknown_references_stay() {
        assert_eq!(decode("&bogus; &amp"), "&bogus; &amp");
        assert_eq!(decode("AT&T; R&D"), "AT&T; R&D");
        assert_eq!(decode("&;"), "&;");
        assert_eq!(decode("plain"), "plain");
    }
}
