//! Parser for the engine's textual replies.
//!
//! Grammar (whitespace-insensitive):
//!
//! ```text
//! reply  := <empty> | value ';'?
//! value  := true | false | string | number | name
//!         | '(' values ')' | '{' values '}'
//!         | NONE '(' ')' | SOME '(' value ')'
//!         | record name (field (',' field)*)? end name ';'?
//! field  := name '=' value
//! ```

use crate::engine::EngineReply;
use crate::{SessionError, SessionResult};

/// Parse one complete engine reply.
pub fn parse_reply(text: &str) -> SessionResult<EngineReply> {
    let mut parser = Parser { text, pos: 0 };
    parser.skip_ws();
    if parser.at_end() {
        return Ok(EngineReply::Nothing);
    }
    let value = parser.value()?;
    parser.skip_ws();
    parser.eat(';');
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing input after reply"));
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> SessionResult<()> {
        self.skip_ws();
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn error(&self, message: &str) -> SessionError {
        SessionError::Reply {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn value(&mut self) -> SessionResult<EngineReply> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of reply")),
            Some('"') => self.string().map(EngineReply::Str),
            Some('(') => {
                self.bump();
                self.sequence(')').map(EngineReply::Tuple)
            }
            Some('{') => {
                self.bump();
                self.sequence('}').map(EngineReply::List)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
        }
    }

    fn word(&mut self) -> SessionResult<EngineReply> {
        let name = self.name()?;
        match name.as_str() {
            "true" => Ok(EngineReply::Bool(true)),
            "false" => Ok(EngineReply::Bool(false)),
            "record" => self.record(),
            "NONE" => {
                self.expect('(')?;
                self.expect(')')?;
                Ok(EngineReply::Nothing)
            }
            "SOME" => {
                self.expect('(')?;
                let inner = self.value()?;
                self.expect(')')?;
                Ok(inner)
            }
            _ => Ok(EngineReply::Name(name)),
        }
    }

    fn name(&mut self) -> SessionResult<String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn string(&mut self) -> SessionResult<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> SessionResult<EngineReply> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.bump();
        }
        let literal = &self.text[start..self.pos];
        literal
            .parse()
            .map(EngineReply::Number)
            .map_err(|_| SessionError::Reply {
                offset: start,
                message: format!("invalid number '{literal}'"),
            })
    }

    fn sequence(&mut self, close: char) -> SessionResult<Vec<EngineReply>> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    fn record(&mut self) -> SessionResult<EngineReply> {
        let name = self.name()?;
        let mut fields = Vec::new();
        loop {
            let field = self.name()?;
            if field == "end" {
                let closing = self.name()?;
                if closing != name {
                    return Err(self.error(&format!(
                        "record '{name}' closed as '{closing}'"
                    )));
                }
                self.skip_ws();
                self.eat(';');
                return Ok(EngineReply::Record { name, fields });
            }
            self.expect('=')?;
            let value = self.value()?;
            fields.push((field, value));
            self.skip_ws();
            self.eat(',');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(parse_reply("true\n").unwrap(), EngineReply::Bool(true));
        assert_eq!(parse_reply("false").unwrap(), EngineReply::Bool(false));
        assert_eq!(parse_reply("-1.5e-3").unwrap(), EngineReply::Number(-1.5e-3));
        assert_eq!(parse_reply("  ").unwrap(), EngineReply::Nothing);
        assert_eq!(parse_reply("NONE()").unwrap(), EngineReply::Nothing);
    }

    #[test]
    fn string_with_escapes_and_newlines() {
        let reply = parse_reply("\"Check of M completed successfully.\nline \\\"two\\\"\"").unwrap();
        assert_eq!(
            reply.as_str(),
            Some("Check of M completed successfully.\nline \"two\"")
        );
    }

    #[test]
    fn lists_and_tuples() {
        let reply = parse_reply("{Modelica, Pendulum.Test}").unwrap();
        assert_eq!(
            reply,
            EngineReply::List(vec![
                EngineReply::Name("Modelica".to_string()),
                EngineReply::Name("Pendulum.Test".to_string()),
            ])
        );
        let reply = parse_reply("(\"/tmp/M\", \"M_init.xml\")").unwrap();
        assert!(matches!(reply, EngineReply::Tuple(ref items) if items.len() == 2));
        assert_eq!(parse_reply("{}").unwrap(), EngineReply::List(vec![]));
    }

    #[test]
    fn simulation_result_record() {
        let text = r#"record SimulationResult
    resultFile = "/tmp/sw/Pendulum_res.csv",
    simulationOptions = "startTime = 0.0, stopTime = 1.0, numberOfIntervals = 500",
    messages = "LOG_SUCCESS       | info    | The simulation finished successfully.
",
    timeFrontend = 0.012,
    timeTotal = 1.25
end SimulationResult;
"#;
        let reply = parse_reply(text).unwrap();
        assert_eq!(
            reply.field("resultFile").and_then(EngineReply::as_str),
            Some("/tmp/sw/Pendulum_res.csv")
        );
        assert!(
            reply
                .field("messages")
                .and_then(EngineReply::as_str)
                .is_some_and(|m| m.contains("LOG_SUCCESS"))
        );
        assert_eq!(reply.field("timeTotal").and_then(EngineReply::as_number), Some(1.25));
    }

    #[test]
    fn malformed_replies() {
        assert!(matches!(
            parse_reply("\"open"),
            Err(SessionError::Reply { .. })
        ));
        assert!(parse_reply("{1, 2").is_err());
        assert!(parse_reply("record A x = 1 end B;").is_err());
        assert!(parse_reply("true false").is_err());
    }
}
