//! Scripted in-process engine for tests.
//!
//! Replies are chosen by command prefix; the most recently registered
//! matching rule wins. Every command received is recorded, and clones share
//! the same script and log so a test can keep a handle after moving the
//! engine into a session.

use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{Engine, EngineReply};
use crate::reply::parse_reply;
use crate::{SessionError, SessionResult};

type Responder = Box<dyn FnMut(&str) -> SessionResult<EngineReply> + Send>;

struct Rule {
    prefix: String,
    respond: Responder,
}

#[derive(Default)]
struct Script {
    rules: Vec<Rule>,
    log: Vec<String>,
}

#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEngine {
    /// Engine that answers every command with [`EngineReply::Nothing`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that accepts directory changes and loads, and reports every
    /// model check as successful.
    pub fn accepting() -> Self {
        Self::new()
            .respond_with("cd(", |command| {
                let dir = command
                    .trim_start_matches("cd(")
                    .trim_end_matches(')')
                    .trim_matches('"');
                Ok(EngineReply::Str(dir.to_string()))
            })
            .reply("loadModel(", "true")
            .reply("loadFile(", "true")
            .reply("setModelicaPath(", "true")
            .reply("getModelicaPath()", "\"/usr/lib/omlibrary\"")
            .reply("getErrorString()", "\"\"")
            .respond_with("checkModel(", |command| {
                let model = command.trim_start_matches("checkModel(").trim_end_matches(')');
                Ok(EngineReply::Str(format!(
                    "Check of {model} completed successfully.\nClass {model} has 4 equation(s) and 4 variable(s).\n1 of these are trivial equation(s).\n"
                )))
            })
    }

    /// Answer commands starting with `prefix` with the parsed `reply` text.
    ///
    /// Reply text that does not parse is answered with the parse error.
    pub fn reply(self, prefix: &str, reply: &str) -> Self {
        match parse_reply(reply) {
            Ok(parsed) => self.respond_with(prefix, move |_| Ok(parsed.clone())),
            Err(err) => {
                let message = err.to_string();
                self.respond_with(prefix, move |_| {
                    Err(SessionError::Reply {
                        offset: 0,
                        message: message.clone(),
                    })
                })
            }
        }
    }

    /// Fail commands starting with `prefix` at the transport level.
    pub fn fail(self, prefix: &str, message: &str) -> Self {
        let message = message.to_string();
        self.respond_with(prefix, move |_| {
            Err(SessionError::Transport {
                message: message.clone(),
            })
        })
    }

    pub fn respond_with<F>(self, prefix: &str, respond: F) -> Self
    where
        F: FnMut(&str) -> SessionResult<EngineReply> + Send + 'static,
    {
        self.lock().rules.push(Rule {
            prefix: prefix.to_string(),
            respond: Box::new(respond),
        });
        self
    }

    /// Every command received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Commands received that start with `prefix`.
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter(|command| command.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Engine for ScriptedEngine {
    fn send(&mut self, expression: &str) -> SessionResult<EngineReply> {
        let mut script = self.lock();
        script.log.push(expression.to_string());
        match script
            .rules
            .iter_mut()
            .rev()
            .find(|rule| expression.starts_with(&rule.prefix))
        {
            Some(rule) => (rule.respond)(expression),
            None => Ok(EngineReply::Nothing),
        }
    }
}

impl std::fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.lock();
        f.debug_struct("ScriptedEngine")
            .field("rules", &script.rules.len())
            .field("commands", &script.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_rules_override_earlier() {
        let mut engine = ScriptedEngine::accepting().reply("loadFile(", "false");
        assert_eq!(engine.send("loadFile(\"./a.mo\")").unwrap(), EngineReply::Bool(false));
        assert_eq!(engine.send("loadModel(Modelica)").unwrap(), EngineReply::Bool(true));
        assert_eq!(engine.send("unknown()").unwrap(), EngineReply::Nothing);
    }

    #[test]
    fn clones_share_the_log() {
        let handle = ScriptedEngine::new().fail("simulate(", "pipe closed");
        let mut engine = handle.clone();
        assert!(engine.send("simulate(M)").is_err());
        assert_eq!(handle.commands(), vec!["simulate(M)".to_string()]);
    }
}
