// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;

/// 转义 Redis glob 元字符，使输入按字面匹配
pub fn escape_glob(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 将 Redis 风格的 glob 模式转换为锚定的正则表达式
///
/// 支持 `*`、`?`、`[...]`（含 `^` 取反和 `a-z` 区间）以及反斜杠转义
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => re.push_str(r"\\"),
            },
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                let mut raw = Vec::new();
                let mut closed = false;
                while let Some(cc) = chars.next() {
                    if cc == ']' {
                        closed = true;
                        break;
                    }
                    if cc == '\\' {
                        if let Some(escaped) = chars.next() {
                            raw.push((escaped, true));
                        }
                        continue;
                    }
                    raw.push((cc, false));
                }

                if closed && !raw.is_empty() {
                    re.push('[');
                    for (i, (cc, escaped)) in raw.iter().enumerate() {
                        match cc {
                            '^' if i == 0 && !escaped => re.push('^'),
                            '-' if !escaped && i > 0 && i + 1 < raw.len() => re.push('-'),
                            other => {
                                if matches!(other, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
                                    re.push('\\');
                                }
                                re.push(*other);
                            }
                        }
                    }
                    re.push(']');
                } else {
                    re.push_str(r"\[");
                    for (cc, _) in raw {
                        re.push_str(&regex::escape(&cc.to_string()));
                    }
                    if closed {
                        re.push_str(r"\]");
                    }
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }

    re.push('$');
    Regex::new(&re)
}
