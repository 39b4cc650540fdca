use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Serialize, Deserialize, Debug)]
pub struct ActionsRequest {
    #[serde(rename = "actionCmd")]
    pub action_cmd: ActionCmd,
    #[serde(rename = "actionNum")]
    pub action_num: String,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionCmd {
    // Areas
    #[serde(rename = "area-arm")]
    AreaArm,
    #[serde(rename = "area-stay")]
    AreaStay,
    #[serde(rename = "area-disarm")]
    AreaDisarm,

    // PGM
    #[serde(rename = "pgm-close")]
    PgmClose,
    #[serde(rename = "pgm-open")]
    PgmOpen,
    #[serde(rename = "pgm-pulse")]
    PgmPulse,
}

impl Display for ActionCmd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Get the serde rename value by deserializing to a Value first
        let json_value = serde_json::to_value(self).map_err(|_| std::fmt::Error)?;

        if let Some(s) = json_value.as_str() {
            write!(f, "{}", s)
        } else {
            Err(std::fmt::Error)
        }
    }
}

/// What to do with an area.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AreaAction {
    Arm,
    Stay,
    Disarm,
}

impl From<AreaAction> for ActionCmd {
    fn from(action: AreaAction) -> Self {
        match action {
            AreaAction::Arm => ActionCmd::AreaArm,
            AreaAction::Stay => ActionCmd::AreaStay,
            AreaAction::Disarm => ActionCmd::AreaDisarm,
        }
    }
}

/// What to do with a programmable output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PgmCommand {
    Pulse,
    On,
    Off,
}

impl From<PgmCommand> for ActionCmd {
    fn from(command: PgmCommand) -> Self {
        match command {
            PgmCommand::Pulse => ActionCmd::PgmPulse,
            PgmCommand::On => ActionCmd::PgmOpen,
            PgmCommand::Off => ActionCmd::PgmClose,
        }
    }
}

impl ActionsRequest {
    pub fn new(action_cmd: impl Into<ActionCmd>, action_num: impl ToString) -> Self {
        Self {
            action_cmd: action_cmd.into(),
            action_num: action_num.to_string(),
        }
    }
}
