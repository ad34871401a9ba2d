//! Test doubles shared across resource and command tests.

use gcloudkit::{CliRunner, CommandOutput, Tool};
use std::collections::VecDeque;
use std::sync::Mutex;

type Reply = Result<String, String>;

#[derive(Debug)]
struct Rule {
    tokens: Vec<String>,
    replies: VecDeque<Reply>,
}

/// In-memory stand-in for the management CLIs.
///
/// Every call is journaled (with the tool name as the first token) so
/// tests can count exact invocations. Responses are matched by rule:
/// a rule applies when the call contains all of its tokens, the most
/// recently added matching rule wins, and a rule with several replies
/// plays them in order, repeating the last one. Calls matching no rule
/// fail like a `NOT_FOUND` from the real CLI, so un-stubbed probes read
/// as absent and un-stubbed mutations fail loudly.
#[derive(Debug, Default)]
pub struct FakeCli {
    calls: Mutex<Vec<Vec<String>>>,
    rules: Mutex<Vec<Rule>>,
}

impl FakeCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub a successful reply for calls containing all `tokens`.
    pub fn ok(self, tokens: &[&str], stdout: &str) -> Self {
        self.seq(tokens, vec![Ok(stdout.to_string())])
    }

    /// Stub a failing reply for calls containing all `tokens`.
    pub fn fail(self, tokens: &[&str], stderr: &str) -> Self {
        self.seq(tokens, vec![Err(stderr.to_string())])
    }

    /// Stub a sequence of replies; the last reply repeats.
    pub fn seq(self, tokens: &[&str], replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "a rule needs at least one reply");
        self.rules.lock().unwrap().push(Rule {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            replies: replies.into(),
        });
        self
    }

    /// Number of journaled calls containing all `tokens`.
    pub fn calls_matching(&self, tokens: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| tokens.iter().all(|t| call.iter().any(|a| a == t)))
            .count()
    }
}

impl CliRunner for FakeCli {
    fn run(&self, tool: Tool, args: &[&str]) -> gcloudkit::Result<CommandOutput> {
        let mut call = vec![tool.binary().to_string()];
        call.extend(args.iter().map(|a| (*a).to_string()));
        self.calls.lock().unwrap().push(call.clone());

        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut().rev() {
            if !rule.tokens.iter().all(|t| call.iter().any(|a| a == t)) {
                continue;
            }
            let reply = if rule.replies.len() > 1 {
                rule.replies.pop_front().expect("non-empty replies")
            } else {
                rule.replies.front().expect("non-empty replies").clone()
            };
            return Ok(match reply {
                Ok(stdout) => CommandOutput::ok(&stdout),
                Err(stderr) => CommandOutput::failed(&stderr),
            });
        }

        Ok(CommandOutput::failed(&format!(
            "ERROR: NOT_FOUND: no fake rule matches {call:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journals_calls_with_tool_prefix() {
        let cli = FakeCli::new();
        cli.run(Tool::Gcloud, &["pubsub", "topics", "list"]).unwrap();
        cli.run(Tool::Bq, &["show", "t"]).unwrap();
        assert_eq!(cli.calls_matching(&["gcloud", "pubsub"]), 1);
        assert_eq!(cli.calls_matching(&["bq", "show"]), 1);
    }

    #[test]
    fn later_rules_override_earlier_ones() {
        let cli = FakeCli::new()
            .ok(&["describe"], "first")
            .ok(&["describe"], "second");
        let out = cli.run(Tool::Gcloud, &["describe"]).unwrap();
        assert_eq!(out.stdout_str(), "second");
    }

    #[test]
    fn sequenced_replies_play_in_order_then_stick() {
        let cli = FakeCli::new().seq(
            &["describe"],
            vec![Err("NOT_FOUND".into()), Ok("{}".into())],
        );
        assert!(!cli.run(Tool::Gcloud, &["describe"]).unwrap().success);
        assert!(cli.run(Tool::Gcloud, &["describe"]).unwrap().success);
        assert!(cli.run(Tool::Gcloud, &["describe"]).unwrap().success);
    }

    #[test]
    fn unmatched_calls_read_as_not_found() {
        let cli = FakeCli::new();
        let out = cli.run(Tool::Gcloud, &["whatever"]).unwrap();
        assert!(!out.success);
        assert!(out.stderr_str().contains("NOT_FOUND"));
    }
}
