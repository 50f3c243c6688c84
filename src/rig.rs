//! Rig motion control.
//!
//! The controller speaks a line-oriented command protocol to the actuator
//! through [`ActuatorPort`]; the wire encoding and the physical link live
//! behind that trait. Establishing the link may take several pings, bounded
//! by the configured retry window. Profile execution runs on a spawned task
//! so the orchestrator can start sensors and recording concurrently, and the
//! task hands the controller back on completion.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::RigConfig;
use crate::error::{Result, RigError};
use crate::types::RotationProfile;

/// Line-oriented command link to the actuator. Implementations own the
/// serial (or simulated) transport; the controller only sees commands in and
/// reply lines out.
pub trait ActuatorPort: Send {
    fn send(&mut self, command: &str) -> Result<String>;
}

pub struct RigController {
    port: Box<dyn ActuatorPort>,
    channel: u8,
}

impl RigController {
    /// Handshake with the actuator, retrying within the bounded window from
    /// the config. Failure here is fatal to the run; there is no degraded
    /// mode without a working rig.
    pub async fn connect(mut port: Box<dyn ActuatorPort>, config: &RigConfig) -> Result<Self> {
        let attempts = config.handshake_attempts.max(1);
        for attempt in 1..=attempts {
            match port.send("PING") {
                Ok(reply) if reply.trim() == "OK" => {
                    log::info!("actuator handshake complete on attempt {attempt}");
                    return Ok(Self {
                        port,
                        channel: config.actuator_channel,
                    });
                }
                Ok(reply) => {
                    log::debug!("handshake attempt {attempt}: unexpected reply {reply:?}");
                }
                Err(e) => {
                    log::debug!("handshake attempt {attempt}: {e}");
                }
            }
            tokio::time::sleep(Duration::from_secs_f64(config.handshake_retry_secs)).await;
        }
        Err(RigError::HandshakeFailed { attempts })
    }

    /// Run the profile on a background task. Does not block the caller; the
    /// returned handle yields the controller back together with the motion
    /// result. The profile is the only state shared with the task and it is
    /// immutable.
    pub fn execute(mut self, profile: RotationProfile) -> JoinHandle<(RigController, Result<()>)> {
        tokio::spawn(async move {
            let result = self.run_profile(&profile).await;
            (self, result)
        })
    }

    async fn run_profile(&mut self, profile: &RotationProfile) -> Result<()> {
        log::info!(
            "rig motion: {} cycles of {} steps",
            profile.cycles,
            profile.steps().len()
        );
        let channel = self.channel;
        let mut current_speed = None;
        for _cycle in 0..profile.cycles {
            for step in profile.steps() {
                if current_speed != Some(step.speed) {
                    self.command(&format!("SPEED {}", step.speed))?;
                    current_speed = Some(step.speed);
                }
                self.command(&format!("MOVE {} {:.1}", channel, step.angle_deg))?;
                tokio::time::sleep(Duration::from_secs_f64(step.hold_secs)).await;
            }
        }
        log::info!("rig motion complete");
        Ok(())
    }

    fn command(&mut self, line: &str) -> Result<()> {
        let reply = self.port.send(line)?;
        if reply.trim() != "OK" {
            return Err(RigError::Actuator(format!(
                "command {line:?} rejected: {reply:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Port that answers "OK" once `dead_pings` pings have been swallowed,
    /// recording every command.
    struct ScriptedPort {
        dead_pings: u32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ActuatorPort for ScriptedPort {
        fn send(&mut self, command: &str) -> Result<String> {
            self.log.lock().unwrap().push(command.to_string());
            if command == "PING" && self.dead_pings > 0 {
                self.dead_pings -= 1;
                return Ok(String::new());
            }
            Ok("OK".to_string())
        }
    }

    fn fast_config() -> RigConfig {
        RigConfig {
            handshake_attempts: 3,
            handshake_retry_secs: 0.001,
            move_time_secs: 0.001,
            num_rotations: 2,
            ..RigConfig::default()
        }
    }

    #[tokio::test]
    async fn test_handshake_retries_until_alive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let port = ScriptedPort {
            dead_pings: 2,
            log: log.clone(),
        };
        let controller = RigController::connect(Box::new(port), &fast_config()).await;
        assert!(controller.is_ok());
        assert_eq!(
            log.lock().unwrap().iter().filter(|c| *c == "PING").count(),
            3
        );
    }

    #[tokio::test]
    async fn test_handshake_exhaustion_is_fatal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let port = ScriptedPort {
            dead_pings: 10,
            log,
        };
        let err = RigController::connect(Box::new(port), &fast_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RigError::HandshakeFailed { attempts: 3 }));
        assert!(err.aborts_run());
    }

    #[tokio::test]
    async fn test_execute_issues_all_cycles() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let port = ScriptedPort {
            dead_pings: 0,
            log: log.clone(),
        };
        let cfg = fast_config();
        let controller = RigController::connect(Box::new(port), &cfg).await.unwrap();

        let profile = cfg.sweep_profile();
        let (_controller, result) = controller.execute(profile).await.unwrap();
        assert!(result.is_ok());

        let commands = log.lock().unwrap();
        let moves = commands.iter().filter(|c| c.starts_with("MOVE")).count();
        // 2 cycles x 2 sweep steps.
        assert_eq!(moves, 4);
        // Speed is constant across the sweep, so it is set exactly once.
        let speeds = commands.iter().filter(|c| c.starts_with("SPEED")).count();
        assert_eq!(speeds, 1);
    }

    #[tokio::test]
    async fn test_rejected_command_fails_motion() {
        struct RejectingPort;
        impl ActuatorPort for RejectingPort {
            fn send(&mut self, command: &str) -> Result<String> {
                if command.starts_with("MOVE") {
                    Ok("ERR".to_string())
                } else {
                    Ok("OK".to_string())
                }
            }
        }
        let cfg = fast_config();
        let controller = RigController::connect(Box::new(RejectingPort), &cfg)
            .await
            .unwrap();
        let (_controller, result) = controller.execute(cfg.sweep_profile()).await.unwrap();
        assert!(matches!(result, Err(RigError::Actuator(_))));
    }
}
