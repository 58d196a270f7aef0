//! Acquisition state tracking and command gating.

use super::protocol::Command;
use crate::types::DriverError;

/// What the driver believes the device is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Not converting, command read mode. Registers are accessible.
    Idle,
    /// Conversions running, data read by command only.
    Converting,
    /// Conversions running, each DRDY edge carries a frame.
    ContinuousRead,
    /// Continuous-read mode selected but not converting: after power-up,
    /// RESET, or STOP/STANDBY while streaming. The device ignores register
    /// traffic until SDATAC.
    ContinuousIdle,
    /// After STOP or STANDBY in command read mode. Treated exactly like `Idle`.
    Stopped,
}

impl AcquisitionState {
    /// No conversions are running.
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            AcquisitionState::Idle | AcquisitionState::Stopped | AcquisitionState::ContinuousIdle
        )
    }

    /// Conversions running in continuous-read mode; data-ready handling is armed.
    pub fn is_streaming(self) -> bool {
        self == AcquisitionState::ContinuousRead
    }

    /// The device is in RDATAC mode, whether or not it is converting.
    pub fn is_continuous_mode(self) -> bool {
        matches!(
            self,
            AcquisitionState::ContinuousRead | AcquisitionState::ContinuousIdle
        )
    }

    /// State after `command` is accepted, or the reason it is rejected.
    pub fn transition(self, command: Command) -> Result<AcquisitionState, DriverError> {
        use AcquisitionState::*;

        let next = match (command, self) {
            (Command::Wakeup, state) => state,
            // STOP and STANDBY leave the read mode alone
            (Command::Standby, state) | (Command::Stop, state) if state.is_continuous_mode() => {
                ContinuousIdle
            }
            (Command::Standby, _) | (Command::Stop, _) => Stopped,
            // RESET restores the power-up default, RDATAC
            (Command::Reset, _) => ContinuousIdle,
            (Command::StopContinuous, _) => Idle,
            (Command::Start, state) if state.is_continuous_mode() => ContinuousRead,
            (Command::Start, _) => Converting,
            (Command::ReadContinuous, Converting) => ContinuousRead,
            (Command::ReadContinuous, state) if state.is_continuous_mode() => state,
            (Command::ReadData, Converting) => Converting,
            (Command::ReadContinuous, state) | (Command::ReadData, state) => {
                return Err(DriverError::InvalidState {
                    operation: command.name(),
                    state,
                })
            }
        };
        Ok(next)
    }

    /// Register access is ignored by the device in continuous-read mode.
    pub fn check_register_access(self, operation: &'static str) -> Result<(), DriverError> {
        if self.is_continuous_mode() {
            return Err(DriverError::InvalidState {
                operation,
                state: self,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AcquisitionState::*;
    use super::*;

    #[test]
    fn acquisition_lifecycle() {
        let state = Idle.transition(Command::Start).unwrap();
        assert_eq!(state, Converting);
        let state = state.transition(Command::ReadContinuous).unwrap();
        assert_eq!(state, ContinuousRead);
        let state = state.transition(Command::StopContinuous).unwrap();
        assert_eq!(state, Idle);
    }

    #[test]
    fn continuous_read_requires_conversions() {
        for state in [Idle, Stopped] {
            assert!(matches!(
                state.transition(Command::ReadContinuous),
                Err(DriverError::InvalidState { .. })
            ));
        }
        assert_eq!(ContinuousRead.transition(Command::ReadContinuous).unwrap(), ContinuousRead);
        assert_eq!(ContinuousIdle.transition(Command::ReadContinuous).unwrap(), ContinuousIdle);
    }

    #[test]
    fn read_data_only_while_converting() {
        assert_eq!(Converting.transition(Command::ReadData).unwrap(), Converting);
        assert!(Idle.transition(Command::ReadData).is_err());
        assert!(ContinuousRead.transition(Command::ReadData).is_err());
        assert!(ContinuousIdle.transition(Command::ReadData).is_err());
    }

    #[test]
    fn reset_returns_to_continuous_mode() {
        for state in [Idle, Converting, ContinuousRead, ContinuousIdle, Stopped] {
            assert_eq!(state.transition(Command::Reset).unwrap(), ContinuousIdle);
            assert_eq!(state.transition(Command::Wakeup).unwrap(), state);
            assert_eq!(state.transition(Command::StopContinuous).unwrap(), Idle);
        }
    }

    #[test]
    fn stop_and_standby_keep_read_mode() {
        for command in [Command::Stop, Command::Standby] {
            assert_eq!(Converting.transition(command).unwrap(), Stopped);
            assert_eq!(Idle.transition(command).unwrap(), Stopped);
            assert_eq!(ContinuousRead.transition(command).unwrap(), ContinuousIdle);
            assert_eq!(ContinuousIdle.transition(command).unwrap(), ContinuousIdle);
            assert!(ContinuousRead.transition(command).unwrap().is_idle());
        }
    }

    #[test]
    fn start_streams_in_continuous_mode() {
        assert_eq!(ContinuousRead.transition(Command::Start).unwrap(), ContinuousRead);
        assert_eq!(ContinuousIdle.transition(Command::Start).unwrap(), ContinuousRead);
        assert_eq!(Stopped.transition(Command::Start).unwrap(), Converting);
    }

    #[test]
    fn register_access_gated_by_read_mode() {
        assert!(Idle.check_register_access("read_register").is_ok());
        assert!(Converting.check_register_access("read_register").is_ok());
        assert!(Stopped.check_register_access("read_register").is_ok());
        assert_eq!(
            ContinuousRead.check_register_access("read_registers"),
            Err(DriverError::InvalidState {
                operation: "read_registers",
                state: ContinuousRead
            })
        );
        assert!(ContinuousIdle.check_register_access("write_register").is_err());
    }
}
