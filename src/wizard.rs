//! Interactive provisioning walkthrough
//!
//! One screen per stage. Every screen offers going back (where the stage
//! machine allows it) and quitting; nothing already produced is thrown away
//! unless the user asks for a restart.

use std::io::Write;

use anyhow::Result;
use tokio::io::AsyncBufRead;

use seedgate_core::{
    AgentTone, ProfileConfig, ProfileVisibility, ProvisionError, ProvisioningOrchestrator,
    RegisteredAccount, Registrar, RegistrationStatus, Stage,
};

use crate::prompt::Prompt;

/// How the walkthrough ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Registered(RegisteredAccount),
    /// Registration abandoned; the identity is kept locally
    LocalOnly,
    Quit,
}

pub struct Wizard<R: Registrar, I, W> {
    orch: ProvisioningOrchestrator<R>,
    prompt: Prompt<I, W>,
}

/// Stage the "back" key returns to
fn previous_stage(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Welcome | Stage::PowSolving | Stage::Submitted => None,
        Stage::KeysGenerated => Some(Stage::Welcome),
        Stage::BackedUp => Some(Stage::KeysGenerated),
        Stage::PowComplete => Some(Stage::BackedUp),
        Stage::ProfileChosen => Some(Stage::PowComplete),
    }
}

impl<R, I, W> Wizard<R, I, W>
where
    R: Registrar,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(orch: ProvisioningOrchestrator<R>, prompt: Prompt<I, W>) -> Self {
        Self { orch, prompt }
    }

    pub fn orchestrator(&self) -> &ProvisioningOrchestrator<R> {
        &self.orch
    }

    pub fn into_output(self) -> W {
        self.prompt.into_output()
    }

    /// Walk the stages until registration, abandonment, or quit.
    pub async fn run(&mut self) -> Result<Outcome> {
        loop {
            let stage = self.orch.stage();
            writeln!(
                self.prompt.out(),
                "\n== Step {} of {}: {} ==",
                stage.step(),
                Stage::ALL.len(),
                stage
            )?;

            let outcome = match stage {
                Stage::Welcome => self.welcome().await?,
                Stage::KeysGenerated => self.backup().await?,
                Stage::BackedUp => self.proof_of_work().await?,
                // solves are always finished before the next screen
                Stage::PowSolving => Some(Outcome::Quit),
                Stage::PowComplete => self.profile().await?,
                Stage::ProfileChosen => self.submit().await?,
                Stage::Submitted => match self.orch.account() {
                    Some(account) => Some(Outcome::Registered(account.clone())),
                    None => Some(Outcome::Quit),
                },
            };
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }
    }

    fn report(&mut self, err: &ProvisionError) -> Result<()> {
        writeln!(self.prompt.out(), "Error: {err}")?;
        if err.is_recoverable() {
            writeln!(self.prompt.out(), "You can try again.")?;
        }
        Ok(())
    }

    fn go_back(&mut self) -> Result<()> {
        if let Some(target) = previous_stage(self.orch.stage()) {
            if let Err(e) = self.orch.go_back(target) {
                self.report(&e)?;
            }
        }
        Ok(())
    }

    async fn welcome(&mut self) -> Result<Option<Outcome>> {
        let out = self.prompt.out();
        writeln!(out, "seedgate creates an anonymous account without email or phone.")?;
        writeln!(out, "Your keys are generated on this device and never sent anywhere.")?;

        let reuse = self.orch.keypair().is_some();
        let label = if reuse {
            "Continue with the identity generated earlier"
        } else {
            "Generate my identity"
        };
        match self.prompt.choose(&[('g', label), ('q', "Quit")]).await? {
            Some('g') => {
                match self.orch.generate_identity() {
                    Ok(keypair) => {
                        let phrase = self
                            .orch
                            .seed_phrase()
                            .map(ToString::to_string)
                            .unwrap_or_default();
                        let out = self.prompt.out();
                        writeln!(out)?;
                        writeln!(out, "Public id:      {}", keypair.public_id())?;
                        writeln!(out, "Private secret: {}", keypair.private_secret())?;
                        writeln!(out, "Seed phrase:    {phrase}")?;
                        writeln!(out)?;
                        writeln!(out, "Write the secret and the phrase down now, in order.")?;
                    }
                    Err(e) => {
                        // no randomness on this host; nothing to retry
                        self.report(&e)?;
                        return Ok(Some(Outcome::Quit));
                    }
                }
                Ok(None)
            }
            _ => Ok(Some(Outcome::Quit)),
        }
    }

    async fn backup(&mut self) -> Result<Option<Outcome>> {
        let picked = self
            .prompt
            .choose(&[
                ('c', "I have written them down"),
                ('b', "Back"),
                ('q', "Quit"),
            ])
            .await?;
        match picked {
            Some('c') => {
                let Some(typed) = self
                    .prompt
                    .line("Type the seed phrase to check it (Enter to skip):")
                    .await?
                else {
                    return Ok(Some(Outcome::Quit));
                };
                let typed = (!typed.is_empty()).then_some(typed);
                if let Err(e) = self.orch.confirm_backup(typed.as_deref()) {
                    self.report(&e)?;
                }
                Ok(None)
            }
            Some('b') => {
                self.go_back()?;
                Ok(None)
            }
            _ => Ok(Some(Outcome::Quit)),
        }
    }

    async fn proof_of_work(&mut self) -> Result<Option<Outcome>> {
        let solved = self.orch.proof_of_work().is_some();
        let label = if solved {
            "Continue with the proof-of-work already solved"
        } else {
            "Solve the proof-of-work"
        };
        let mut options = vec![('s', label)];
        if solved {
            options.push(('r', "Discard it and solve again"));
        }
        options.extend([('b', "Back"), ('q', "Quit")]);

        match self.prompt.choose(&options).await? {
            Some('s') if solved => {
                if let Err(e) = self.orch.solve_pow().await {
                    self.report(&e)?;
                }
                Ok(None)
            }
            Some('s') => {
                self.solve_with_progress().await?;
                Ok(None)
            }
            Some('r') => {
                if let Err(e) = self.orch.restart_pow() {
                    self.report(&e)?;
                }
                Ok(None)
            }
            Some('b') => {
                self.go_back()?;
                Ok(None)
            }
            _ => Ok(Some(Outcome::Quit)),
        }
    }

    async fn solve_with_progress(&mut self) -> Result<()> {
        let difficulty = self.orch.solver().params().difficulty;
        writeln!(
            self.prompt.out(),
            "Searching for a hash with {difficulty} leading zeros. Ctrl-C cancels."
        )?;

        let task = match self.orch.start_pow() {
            Ok(task) => task,
            Err(e) => return self.report(&e),
        };
        let mut status = task.subscribe();
        let cancel = task.cancellation_token();

        loop {
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = status.borrow_and_update().clone();
                    let out = self.prompt.out();
                    write!(out, "\r  {:>3.0}%", current.progress() * 100.0)?;
                    out.flush()?;
                    if current.is_finished() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
            }
        }
        writeln!(self.prompt.out())?;

        match self.orch.finish_pow(task.join().await) {
            Ok(result) => writeln!(
                self.prompt.out(),
                "Solved at nonce {} ({})",
                result.nonce,
                result.hash
            )?,
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    async fn profile(&mut self) -> Result<Option<Outcome>> {
        let picked = self
            .prompt
            .choose(&[
                ('p', "Choose profile settings"),
                ('r', "Discard the proof-of-work and solve again"),
                ('b', "Back"),
                ('q', "Quit"),
            ])
            .await?;
        match picked {
            Some('p') => {
                let Some(profile) = self.ask_profile().await? else {
                    return Ok(Some(Outcome::Quit));
                };
                if let Err(e) = self.orch.choose_profile(profile) {
                    self.report(&e)?;
                }
                Ok(None)
            }
            Some('r') => {
                if let Err(e) = self.orch.restart_pow() {
                    self.report(&e)?;
                }
                Ok(None)
            }
            Some('b') => {
                self.go_back()?;
                Ok(None)
            }
            _ => Ok(Some(Outcome::Quit)),
        }
    }

    /// Ask for visibility, tone, and verbosity, re-asking on invalid input
    async fn ask_profile(&mut self) -> Result<Option<ProfileConfig>> {
        let current = self.orch.profile().cloned().unwrap_or_default();

        let visibility = loop {
            let Some(answer) = self
                .prompt
                .with_default(
                    "Profile visibility (public, anonymous, private)",
                    &current.visibility.to_string(),
                )
                .await?
            else {
                return Ok(None);
            };
            match answer.parse::<ProfileVisibility>() {
                Ok(v) => break v,
                Err(e) => self.report(&e)?,
            }
        };

        let tone = loop {
            let Some(answer) = self
                .prompt
                .with_default(
                    "Agent tone (neutral, friendly, formal, concise, playful)",
                    &current.agent.tone.to_string(),
                )
                .await?
            else {
                return Ok(None);
            };
            match answer.parse::<AgentTone>() {
                Ok(t) => break t,
                Err(e) => self.report(&e)?,
            }
        };

        loop {
            let Some(answer) = self
                .prompt
                .with_default(
                    "Agent verbosity (1-5)",
                    &current.agent.verbosity.to_string(),
                )
                .await?
            else {
                return Ok(None);
            };
            let Ok(verbosity) = answer.parse::<u8>() else {
                self.report(&ProvisionError::Config(format!(
                    "agent verbosity '{answer}' is not a number from 1 to 5"
                )))?;
                continue;
            };
            let profile = ProfileConfig::new(visibility, tone, verbosity);
            match profile.validate() {
                Ok(()) => return Ok(Some(profile)),
                Err(e) => self.report(&e)?,
            }
        }
    }

    async fn submit(&mut self) -> Result<Option<Outcome>> {
        let failed = matches!(
            self.orch.registration_status(),
            RegistrationStatus::Failed { .. }
        );
        let mut options = vec![(
            's',
            if failed {
                "Retry registration"
            } else {
                "Register the account"
            },
        )];
        if failed {
            options.push(('a', "Stop trying and keep the identity locally"));
        }
        options.extend([('b', "Back"), ('q', "Quit")]);

        match self.prompt.choose(&options).await? {
            Some('s') => {
                writeln!(self.prompt.out(), "Submitting...")?;
                match self.orch.submit().await {
                    Ok(account) => {
                        let out = self.prompt.out();
                        writeln!(out, "Registered.")?;
                        writeln!(out, "  User id:      {}", account.user_id)?;
                        writeln!(out, "  Status:       {}", account.account_status)?;
                        writeln!(out, "  Ledger block: {}", account.ledger_block_id)?;
                        Ok(Some(Outcome::Registered(account)))
                    }
                    Err(e) => {
                        self.report(&e)?;
                        writeln!(
                            self.prompt.out(),
                            "Your proof-of-work is kept; retrying does not redo it."
                        )?;
                        Ok(None)
                    }
                }
            }
            Some('a') => {
                let notice = self.orch.abandon_registration()?;
                writeln!(self.prompt.out(), "{notice}")?;
                Ok(Some(Outcome::LocalOnly))
            }
            Some('b') => {
                self.go_back()?;
                Ok(None)
            }
            _ => Ok(Some(Outcome::Quit)),
        }
    }
}
