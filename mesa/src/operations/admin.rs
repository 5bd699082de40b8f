//! Table administration: blocking, activation and the end of cleaning.

use rusqlite::Connection;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::ids::TableId;
use crate::role::{Actor, Role};
use crate::table::{FusionState, Table, TableState, TableStatus};

use super::plan::{OperationPlan, PlanAction};

/// An administrative change to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAdminAction {
    /// Withdraw the table from assignment.
    Block,
    /// Return a blocked table to service.
    Unblock,
    /// Put a deactivated table back on the floor plan.
    Activate,
    /// Take the table off the floor plan.
    Deactivate,
    /// Mark a cleaned table (and the rest of its group) ready again.
    FinishCleaning,
}

impl TableAdminAction {
    const fn required_role(self) -> Role {
        match self {
            Self::FinishCleaning => Role::Host,
            _ => Role::Manager,
        }
    }

    const fn verb(self) -> &'static str {
        match self {
            Self::Block => "block tables",
            Self::Unblock => "unblock tables",
            Self::Activate => "activate tables",
            Self::Deactivate => "deactivate tables",
            Self::FinishCleaning => "finish cleaning",
        }
    }
}

/// Options for a table administration operation.
#[derive(Debug, Clone)]
pub struct TableAdminOptions {
    /// The table.
    pub table: TableId,
    /// What to do.
    pub action: TableAdminAction,
    /// Who does it.
    pub actor: Actor,
    /// Describe the plan without writing.
    pub dry_run: bool,
}

impl TableAdminOptions {
    /// Creates options for `action` on `table`.
    #[must_use]
    pub const fn new(table: TableId, action: TableAdminAction, actor: Actor) -> Self {
        Self {
            table,
            action,
            actor,
            dry_run: false,
        }
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A table administration plan generator.
pub struct TableAdminPlan {
    options: TableAdminOptions,
}

impl TableAdminPlan {
    /// Creates a new plan with the given options.
    #[must_use]
    pub const fn new(options: TableAdminOptions) -> Self {
        Self { options }
    }

    /// Builds the plan. Repeating a change that is already in effect yields
    /// an empty plan with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor lacks the role (manager, or host for
    /// finishing cleaning), the table does not exist, or a fused table is
    /// being blocked.
    pub fn build_plan(&self, conn: &Connection) -> Result<OperationPlan> {
        let action = self.options.action;
        self.options.actor.require(action.required_role(), action.verb())?;
        let table = Database::get_table(conn, self.options.table)?.ok_or_else(|| {
            Error::TableNotFound {
                table: self.options.table.to_string(),
            }
        })?;

        match action {
            TableAdminAction::Block => Self::block(conn, &table),
            TableAdminAction::Unblock => Ok(Self::unblock(&table)),
            TableAdminAction::Activate | TableAdminAction::Deactivate => {
                Self::set_active(conn, &table, action == TableAdminAction::Activate)
            }
            TableAdminAction::FinishCleaning => Self::finish_cleaning(conn, &table),
        }
    }

    fn block(conn: &Connection, table: &Table) -> Result<OperationPlan> {
        let mut plan = OperationPlan::new(format!("Block table {}", table.number));
        match table.fusion {
            FusionState::Blocked => {
                return Ok(plan.add_warning(format!("table {} is already blocked", table.number)))
            }
            FusionState::FusionMaster | FusionState::FusionSlave { .. } => {
                return Err(Error::Validation {
                    field: "table".into(),
                    message: format!(
                        "table {} is part of a fusion group; release its reservation first",
                        table.number
                    ),
                })
            }
            FusionState::Individual => {}
        }

        let holders = Database::reservations_holding(conn, table.id, None)?;
        if !holders.is_empty() {
            let ids: Vec<String> = holders.iter().map(ToString::to_string).collect();
            plan = plan.add_warning(format!(
                "table {} stays assigned to reservation(s) {}",
                table.number,
                ids.join(", ")
            ));
        }
        Ok(plan.add_action(state_change(
            table,
            TableState {
                status: table.status,
                fusion: FusionState::Blocked,
            },
        )))
    }

    fn unblock(table: &Table) -> OperationPlan {
        let plan = OperationPlan::new(format!("Unblock table {}", table.number));
        if table.fusion != FusionState::Blocked {
            return plan.add_warning(format!("table {} is not blocked", table.number));
        }
        plan.add_action(state_change(
            table,
            TableState {
                status: table.status,
                fusion: FusionState::Individual,
            },
        ))
    }

    fn set_active(conn: &Connection, table: &Table, active: bool) -> Result<OperationPlan> {
        let verb = if active { "Activate" } else { "Deactivate" };
        let mut plan = OperationPlan::new(format!("{verb} table {}", table.number));
        if table.active == active {
            let state = if active { "active" } else { "inactive" };
            return Ok(plan.add_warning(format!("table {} is already {state}", table.number)));
        }
        if !active {
            let holders = Database::reservations_holding(conn, table.id, None)?;
            if !holders.is_empty() {
                plan = plan.add_warning(format!(
                    "table {} is still assigned to {} reservation(s); reassign them",
                    table.number,
                    holders.len()
                ));
            }
        }
        Ok(plan.add_action(PlanAction::SetTableActive {
            table: table.id,
            number: table.number,
            active,
            expected_version: table.version,
        }))
    }

    fn finish_cleaning(conn: &Connection, table: &Table) -> Result<OperationPlan> {
        let plan = OperationPlan::new(format!("Finish cleaning table {}", table.number));
        if table.status != TableStatus::Cleaning {
            return Ok(plan.add_warning(format!(
                "table {} is {}, not cleaning",
                table.number, table.status
            )));
        }

        let group = match table.fusion {
            FusionState::FusionMaster => Database::fusion_group(conn, table.id)?,
            FusionState::FusionSlave { master } => Database::fusion_group(conn, master)?,
            FusionState::Individual | FusionState::Blocked => vec![table.clone()],
        };

        // the group outlives the cleaning while a group booking still holds it
        let mut dissolve = table.is_fused();
        for member in &group {
            if !Database::group_holders(conn, member.id, None)?.is_empty() {
                dissolve = false;
                break;
            }
        }

        let mut actions = Vec::new();
        for member in &group {
            let cleaning = member.status == TableStatus::Cleaning;
            if !cleaning && !dissolve {
                continue;
            }
            let status = if cleaning {
                let held = !Database::reservations_holding(conn, member.id, None)?.is_empty();
                if held {
                    TableStatus::Reserved
                } else {
                    TableStatus::Free
                }
            } else {
                member.status
            };
            let fusion = if dissolve && member.is_fused() {
                FusionState::Individual
            } else {
                member.fusion
            };
            let to = TableState { status, fusion };
            if to != member.state() {
                actions.push(state_change(member, to));
            }
        }
        Ok(plan.add_actions(actions))
    }
}

fn state_change(table: &Table, to: TableState) -> PlanAction {
    PlanAction::UpdateTableState {
        table: table.id,
        number: table.number,
        from: table.state(),
        to,
        expected_version: table.version,
        reservation: None,
    }
}
