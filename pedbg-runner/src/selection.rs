//! Resolution of ambiguous tool and probe candidates
//!
//! Discovery may find several installed plugins or several connected probes.
//! Zero and one candidates are handled by [`select`]; anything more is handed
//! to a [`Resolver`] so callers choose between failing, a fixed choice, or an
//! interactive prompt.

use std::fmt::Display;
use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// Why a resolver could not pick a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbiguityError {
    /// More than one candidate and the policy does not choose
    Ambiguous,
    /// The requested choice does not exist
    OutOfRange { choice: usize, count: usize },
    /// Input ended before a choice was made
    Cancelled,
}

/// Picks one of several candidates, returning its zero-based index
pub trait Resolver {
    fn resolve(&mut self, candidates: &[String]) -> std::result::Result<usize, AmbiguityError>;

    /// Whether the resolver shows the candidates to the user itself
    fn lists_candidates(&self) -> bool {
        false
    }
}

/// Never chooses; ambiguity is an error
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireUnique;

impl Resolver for RequireUnique {
    fn resolve(&mut self, _candidates: &[String]) -> std::result::Result<usize, AmbiguityError> {
        Err(AmbiguityError::Ambiguous)
    }
}

/// Deterministic 1-based choice
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub usize);

impl Resolver for Fixed {
    fn resolve(&mut self, candidates: &[String]) -> std::result::Result<usize, AmbiguityError> {
        if (1..=candidates.len()).contains(&self.0) {
            Ok(self.0 - 1)
        } else {
            Err(AmbiguityError::OutOfRange { choice: self.0, count: candidates.len() })
        }
    }
}

/// Asks the user on a reader/writer pair until a valid number is entered
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Prompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Resolver for Prompt<R, W> {
    fn resolve(&mut self, candidates: &[String]) -> std::result::Result<usize, AmbiguityError> {
        for (i, candidate) in candidates.iter().enumerate() {
            let _ = writeln!(self.output, "{}. {}", i + 1, candidate);
        }

        let mut line = String::new();
        loop {
            let _ = write!(self.output, "Please select one (1-{}): ", candidates.len());
            let _ = self.output.flush();

            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return Err(AmbiguityError::Cancelled),
                Ok(_) => {}
            }

            if let Ok(value) = line.trim().parse::<usize>() {
                if (1..=candidates.len()).contains(&value) {
                    return Ok(value - 1);
                }
            }
        }
    }

    fn lists_candidates(&self) -> bool {
        true
    }
}

/// Choose exactly one of `candidates`.
///
/// `kind` names the candidates in error messages, e.g. "P&E Micro plugins installed".
pub fn select<T: Display>(
    kind: &str,
    mut candidates: Vec<T>,
    resolver: &mut dyn Resolver,
) -> Result<T> {
    match candidates.len() {
        0 => Err(RunnerError::NoCandidates(kind.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => {
            let names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
            info!("There are multiple {}", kind);
            if !resolver.lists_candidates() {
                for (i, name) in names.iter().enumerate() {
                    info!("  {}. {}", i + 1, name);
                }
            }

            match resolver.resolve(&names) {
                Ok(index) => {
                    debug!("Selected {}", names[index]);
                    Ok(candidates.swap_remove(index))
                }
                Err(AmbiguityError::Cancelled) => Err(RunnerError::SelectionCancelled),
                Err(AmbiguityError::OutOfRange { choice, count }) => Err(RunnerError::InvalidConfig(
                    format!("selection {} is out of range (1-{})", choice, count),
                )),
                Err(AmbiguityError::Ambiguous) => Err(RunnerError::Ambiguous {
                    kind: kind.to_string(),
                    candidates: names,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_select_empty_fails() {
        let err = select::<String>("debug probes connected", vec![], &mut RequireUnique).unwrap_err();
        assert_eq!(err.to_string(), "there are no debug probes connected");
    }

    #[test]
    fn test_select_single_skips_resolver() {
        struct Panics;
        impl Resolver for Panics {
            fn resolve(&mut self, _: &[String]) -> std::result::Result<usize, AmbiguityError> {
                panic!("resolver must not be consulted");
            }
        }

        let chosen = select("plugins", vec!["only".to_string()], &mut Panics).unwrap();
        assert_eq!(chosen, "only");
    }

    #[test]
    fn test_require_unique_lists_candidates() {
        let err = select("debug probes connected", candidates(), &mut RequireUnique).unwrap_err();
        match err {
            RunnerError::Ambiguous { kind, candidates } => {
                assert_eq!(kind, "debug probes connected");
                assert_eq!(candidates, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fixed_choice() {
        assert_eq!(select("plugins", candidates(), &mut Fixed(2)).unwrap(), "b");
        assert_eq!(select("plugins", candidates(), &mut Fixed(3)).unwrap(), "c");
        assert!(matches!(
            select("plugins", candidates(), &mut Fixed(4)),
            Err(RunnerError::InvalidConfig(_))
        ));
        assert!(select("plugins", candidates(), &mut Fixed(0)).is_err());
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let input = b"x\n9\n3\n".as_slice();
        let mut output = Vec::new();
        let chosen = select("plugins", candidates(), &mut Prompt::new(input, &mut output)).unwrap();
        assert_eq!(chosen, "c");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.starts_with("1. a\n2. b\n3. c\n"));
        assert_eq!(shown.matches("Please select one (1-3): ").count(), 3);
    }

    #[test]
    fn test_only_prompt_lists_candidates() {
        assert!(Prompt::new(b"".as_slice(), Vec::new()).lists_candidates());
        assert!(!RequireUnique.lists_candidates());
        assert!(!Fixed(1).lists_candidates());
    }

    #[test]
    fn test_prompt_end_of_input_cancels() {
        let mut output = Vec::new();
        let err = select("plugins", candidates(), &mut Prompt::new(b"".as_slice(), &mut output))
            .unwrap_err();
        assert!(matches!(err, RunnerError::SelectionCancelled));
    }
}
