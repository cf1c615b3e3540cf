use super::Failure;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    /// Punctuation and operators, e.g. `(`, `**`, `<=`.
    Punct(&'static str),
}

// Longest operators first so `**` wins over `*`.
const PUNCT: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "(", ")", "[", "]", "{", "}", ",", ":", ".", "+", "-",
    "*", "/", "%", "<", ">",
];

pub fn tokenize(text: &str) -> Result<Vec<Token>, Failure> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // `xs.0.1` is two index steps.
        if c.is_ascii_digit() && tokens.last() == Some(&Token::Punct(".")) {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let idx = text
                .parse()
                .map_err(|_| Failure::Invalid(format!("bad index {:?}", text)))?;
            tokens.push(Token::Int(idx));
            continue;
        }

        // `.5` is a float, but `xs.0` is an index step.
        let after_operand = matches!(
            tokens.last(),
            Some(Token::Ident(_)) | Some(Token::Punct(")" | "]" | "}"))
        );
        if c.is_ascii_digit()
            || (c == '.' && !after_operand && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let (token, next) = number(&chars, i)?;
            tokens.push(token);
            i = next;
            continue;
        }

        if c == '\'' || c == '"' {
            let (token, next) = string(&chars, i)?;
            tokens.push(token);
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
        match PUNCT.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                tokens.push(Token::Punct(*p));
                i += p.len();
            }
            None => return Err(Failure::Invalid(format!("unexpected character {:?}", c))),
        }
    }

    Ok(tokens)
}

fn number(chars: &[char], start: usize) -> Result<(Token, usize), Failure> {
    let mut i = start;
    let mut is_float = false;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_none_or(|c| c.is_ascii_digit()) {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            is_float = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| Failure::Invalid(format!("bad float literal {:?}", text)))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| Failure::Invalid(format!("bad integer literal {:?}", text)))?,
        )
    };
    Ok((token, i))
}

fn string(chars: &[char], start: usize) -> Result<(Token, usize), Failure> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((Token::Str(out), i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| Failure::Invalid("unterminated string literal".to_string()))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => *other,
                });
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(Failure::Invalid("unterminated string literal".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_and_literals() {
        let tokens = tokenize("2 ** x[0] // 3.5 != 'a\\'b'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Int(2),
                Token::Punct("**"),
                Token::Ident("x".into()),
                Token::Punct("["),
                Token::Int(0),
                Token::Punct("]"),
                Token::Punct("//"),
                Token::Float(3.5),
                Token::Punct("!="),
                Token::Str("a'b".into()),
            ]
        );
    }

    #[test]
    fn exponent_floats() {
        assert_eq!(tokenize("1e-7").unwrap(), vec![Token::Float(1e-7)]);
        assert_eq!(tokenize("49.0").unwrap(), vec![Token::Float(49.0)]);
    }

    #[test]
    fn dollar_is_rejected() {
        assert!(matches!(tokenize("$.a"), Err(Failure::Invalid(_))));
    }
}
