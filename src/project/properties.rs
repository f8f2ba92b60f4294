//! Java `.properties` 형식의 부분 집합 파서
//!
//! 주석(`#`, `!`), `=` / `:` / 공백 구분자, 백슬래시 줄 이어쓰기,
//! 기본 이스케이프(`\t`, `\n`, `\r`, `\uXXXX`)를 지원합니다.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// 프로퍼티 텍스트를 키/값 맵으로 파싱
pub fn parse(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    let mut logical = String::new();

    for raw in content.lines() {
        let line = raw.trim_start();

        if logical.is_empty()
            && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }

        logical.push_str(line);
        if let Some((key, value)) = split_entry(&logical) {
            entries.insert(key, value);
        }
        logical.clear();
    }

    // 마지막 줄이 백슬래시로 끝난 경우
    if let Some((key, value)) = split_entry(&logical) {
        entries.insert(key, value);
    }

    entries
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = read_escape(&mut chars) {
                    key.push(escaped);
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                    chars.next();
                }
                if matches!(chars.peek(), Some('=') | Some(':')) {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    if key.is_empty() {
        return None;
    }

    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = read_escape(&mut chars) {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }

    Some((key, value))
}

fn read_escape(chars: &mut Peekable<Chars<'_>>) -> Option<char> {
    let c = chars.next()?;
    let escaped = match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        'u' => {
            let hex: String = chars.by_ref().take(4).collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        }
        other => other,
    };
    Some(escaped)
}
