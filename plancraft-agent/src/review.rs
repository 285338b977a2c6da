//! Human review gate between planning and development

use plancraft_error::{Error, Result};
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Go on to development with the plan as it is now on disk
    Approve,
    /// Stop; the plan stays on disk for a later `develop`
    Quit,
}

/// Blocks until the operator has reviewed the plan at `plan_path`.
pub trait ReviewGate {
    fn review(&mut self, plan_path: &Path) -> Result<ReviewDecision>;
}

impl<G: ReviewGate + ?Sized> ReviewGate for Box<G> {
    fn review(&mut self, plan_path: &Path) -> Result<ReviewDecision> {
        (**self).review(plan_path)
    }
}

/// Approves every plan without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ReviewGate for AutoApprove {
    fn review(&mut self, plan_path: &Path) -> Result<ReviewDecision> {
        tracing::info!(plan = %plan_path.display(), "plan approved without review");
        Ok(ReviewDecision::Approve)
    }
}

/// Print `question` and read one line. `None` at end of input.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<Option<String>> {
    write!(output, "{}", question).map_err(|e| Error::from(e).with_operation("review::ask"))?;
    output.flush().map_err(|e| Error::from(e).with_operation("review::ask"))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| Error::from(e).with_operation("review::ask"))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Console gate: the operator edits the plan, then types `approve` or `quit`.
pub struct ConsoleReview<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleReview<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsoleReview<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ReviewGate for ConsoleReview<R, W> {
    fn review(&mut self, plan_path: &Path) -> Result<ReviewDecision> {
        let out = &mut self.output;
        writeln!(out, "\nPlease review and edit the plan file: {}", plan_path.display())
            .and_then(|_| writeln!(out, "Make any necessary changes, then return here."))
            .map_err(|e| Error::from(e).with_operation("review::console"))?;

        loop {
            let answer = ask(
                &mut self.input,
                &mut self.output,
                "\nType 'approve' to proceed with development, or 'quit' to exit: ",
            )?;

            // Closed stdin cannot approve anything
            let Some(answer) = answer else {
                return Ok(ReviewDecision::Quit);
            };

            match answer.to_ascii_lowercase().as_str() {
                "approve" => return Ok(ReviewDecision::Approve),
                "quit" => return Ok(ReviewDecision::Quit),
                _ => {
                    writeln!(self.output, "Please type 'approve' or 'quit'")
                        .map_err(|e| Error::from(e).with_operation("review::console"))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn review(input: &str) -> (ReviewDecision, String) {
        let mut output = Vec::new();
        let decision = ConsoleReview::new(Cursor::new(input.to_string()), &mut output)
            .review(Path::new("plans/implementation_plan_20250114_093012.md"))
            .unwrap();
        (decision, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_approve() {
        let (decision, output) = review("approve\n");
        assert_eq!(decision, ReviewDecision::Approve);
        assert!(output.contains("plans/implementation_plan_20250114_093012.md"));
    }

    #[test]
    fn test_reprompts_until_known_answer() {
        let (decision, output) = review("yes\n\n  QUIT \n");
        assert_eq!(decision, ReviewDecision::Quit);
        assert_eq!(output.matches("Please type 'approve' or 'quit'").count(), 2);
    }

    #[test]
    fn test_end_of_input_quits() {
        let (decision, _) = review("maybe\n");
        assert_eq!(decision, ReviewDecision::Quit);
    }

    #[test]
    fn test_ask() {
        let mut input = Cursor::new("  a todo app  \n");
        let mut output = Vec::new();
        let answer = ask(&mut input, &mut output, "Describe: ").unwrap();

        assert_eq!(answer.as_deref(), Some("a todo app"));
        assert_eq!(output, b"Describe: ");
        assert_eq!(ask(&mut input, &mut output, "again: ").unwrap(), None);
    }

    #[test]
    fn test_auto_approve() {
        assert_eq!(AutoApprove.review(Path::new("p.md")).unwrap(), ReviewDecision::Approve);

        let mut boxed: Box<dyn ReviewGate> = Box::new(AutoApprove);
        assert_eq!(boxed.review(Path::new("p.md")).unwrap(), ReviewDecision::Approve);
    }
}
