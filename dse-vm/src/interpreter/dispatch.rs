//! Opcode dispatch: a compile-time match from decoded opcode to handler.

use dse_asm::{Command, Opcode, Recognition};

use crate::error::PanicReason;

use super::{ExecuteState, Vm};

impl Vm {
    #[tracing::instrument(name = "dispatch", skip(self, command))]
    pub(super) fn dispatch(&mut self, command: Command) -> Result<ExecuteState, PanicReason> {
        let opcode = match Opcode::recognize(command.opcode()) {
            Recognition::Implemented(opcode) => opcode,
            Recognition::DeclaredUnimplemented => {
                return Err(PanicReason::UnimplementedOpcode { opcode: command.opcode() })
            }
            Recognition::Unknown => return Err(PanicReason::UnknownOpcode { opcode: command.opcode() }),
        };

        tracing::trace!(?opcode, "dispatching command");

        match opcode {
            Opcode::Break => Err(PanicReason::BreakHit),
            Opcode::Nop => Ok(ExecuteState::Continue),
            Opcode::Reserve => self.op_reserve(command).map(|()| ExecuteState::Continue),
            Opcode::Reference => self.op_reference(command).map(|()| ExecuteState::Continue),
            Opcode::SwitchFocus => self.op_switch_focus(command).map(|()| ExecuteState::Continue),
            Opcode::Write => self.op_write(command).map(|()| ExecuteState::Continue),
            Opcode::WriteArray => self.op_write_array(command).map(|()| ExecuteState::Continue),
            Opcode::Mv => self.op_mv(command).map(|()| ExecuteState::Continue),
            Opcode::SetWrPtr => self.op_set_wr_ptr(command).map(|()| ExecuteState::Continue),
            Opcode::EndSpec => self.op_end_spec(command).map(|()| ExecuteState::Terminated),
            // `Opcode` is `#[non_exhaustive]`, so this match needs a catch-all
            // even though every variant is handled above. `Opcode::recognize`
            // already routed declared-but-unimplemented and unknown bytes
            // away before we got here, so this arm only exists to keep
            // compiling if a future `dse-asm` release adds a variant this
            // match hasn't been updated for yet.
            _ => Err(PanicReason::UnimplementedOpcode { opcode: command.opcode() }),
        }
    }
}
