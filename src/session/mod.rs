mod ledger;
mod turn;

pub use ledger::{
    apply_undo, CommandRun, LedgerState, MutationLedger, SettingChange, UndoAction, UndoReport,
};
pub use turn::TurnContext;
