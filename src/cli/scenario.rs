//! `scenario` command: replays a fixed start/stop sequence against a fresh
//! controller and checks every result.

use crate::error::PairingError;
use crate::pairing::{ConnectionToken, SessionController};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStep {
    Start(&'static str),
    Stop(&'static str, Option<&'static str>),
}

impl std::fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start(t) => write!(f, "start({})", t),
            Self::Stop(t, None) => write!(f, "stop({}, ok)", t),
            Self::Stop(t, Some(e)) => write!(f, "stop({}, {})", t, e),
        }
    }
}

/// Observed result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Ok,
    Rejected(PairingError),
    Stopped,
}

impl std::fmt::Display for StepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Rejected(PairingError::AlreadyPairing) => write!(f, "AlreadyPairing"),
            Self::Rejected(PairingError::AlreadyPaired { token }) => {
                write!(f, "AlreadyPaired({})", token)
            }
            Self::Rejected(other) => write!(f, "{}", other),
            Self::Stopped => write!(f, "-"),
        }
    }
}

fn paired(token: &str) -> StepResult {
    StepResult::Rejected(PairingError::AlreadyPaired {
        token: ConnectionToken::from(token),
    })
}

/// The admission sequence with the result each step must produce.
pub fn scripted_steps() -> Vec<(ScenarioStep, StepResult)> {
    use ScenarioStep::{Start, Stop};
    let busy = || StepResult::Rejected(PairingError::AlreadyPairing);

    vec![
        (Start("A"), StepResult::Ok),
        (Start("A"), busy()),
        (Stop("A", Some("err1")), StepResult::Stopped),
        (Start("A"), StepResult::Ok),
        (Stop("A", None), StepResult::Stopped),
        (Start("A"), paired("A")),
        (Start("B"), StepResult::Ok),
        (Start("B"), busy()),
        (Start("C"), busy()),
        (Stop("B", Some("err2")), StepResult::Stopped),
        (Start("C"), StepResult::Ok),
        (Stop("C", None), StepResult::Stopped),
        (Start("C"), paired("C")),
    ]
}

/// Apply `steps` to `controller`, returning what each produced.
pub fn run_scenario(controller: &SessionController, steps: &[ScenarioStep]) -> Vec<StepResult> {
    steps
        .iter()
        .map(|step| match step {
            ScenarioStep::Start(t) => match controller.start_pairing(&ConnectionToken::from(*t)) {
                Ok(()) => StepResult::Ok,
                Err(e) => StepResult::Rejected(e),
            },
            ScenarioStep::Stop(t, err) => {
                controller.stop_pairing(&ConnectionToken::from(*t), err.map(str::to_string));
                StepResult::Stopped
            }
        })
        .collect()
}

pub fn run_scenario_command() -> anyhow::Result<()> {
    let script = scripted_steps();
    let steps: Vec<ScenarioStep> = script.iter().map(|(step, _)| step.clone()).collect();
    let controller = SessionController::new();
    let observed = run_scenario(&controller, &steps);

    let mut mismatches = 0;
    for ((step, expected), actual) in script.iter().zip(&observed) {
        let mark = if expected == actual { "ok " } else { "!! " };
        if expected != actual {
            mismatches += 1;
        }
        println!("{}{:<18} -> {}", mark, step.to_string(), actual);
    }

    if mismatches > 0 {
        anyhow::bail!("{} step(s) diverged from the expected sequence", mismatches);
    }
    println!("final state: {}", controller.state());
    Ok(())
}
