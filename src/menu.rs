//! Interactive numbered menu.
//!
//! Every action reports its own errors and returns to the menu; the loop only
//! ends on the exit choice or end of input.
use crate::scenario::catalog::{list_scenarios, load_scenario};
use crate::scenario::engine::{ScenarioEngine, ScenarioSource};
use crate::workflow::{self, KitContext};
use anyhow::Result;
use std::io::{BufRead, Write};

const MAIN_MENU: &str = "\nHTB Challenge Tool
1. Set up a new challenge
2. Connect to VPN
3. Scenarios
4. Run tools
5. Generate report
6. Validate scenario configs
7. Record a flag
8. Check installed tools
9. Exit";

enum Flow {
    Continue,
    Exit,
}

pub struct Menu<'a, R, W> {
    ctx: &'a KitContext,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(ctx: &'a KitContext, input: R, out: W) -> Self {
        Self { ctx, input, out }
    }

    /// Run until the user exits. Only I/O failures on the terminal escape.
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.out, "{MAIN_MENU}")?;
            let Some(choice) = self.prompt("Enter your choice")? else {
                writeln!(self.out)?;
                return Ok(());
            };
            let action = match choice.as_str() {
                "1" => self.setup(),
                "2" => self.vpn(),
                "3" => self.scenarios(),
                "4" => self.tools(),
                "5" => self.report(),
                "6" => self.validate(),
                "7" => self.flag(),
                "8" => self.check(),
                "9" => {
                    writeln!(self.out, "Exiting...")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.out, "Invalid choice. Please try again.")?;
                    Ok(Flow::Continue)
                }
            };
            match action {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(err) => {
                    tracing::debug!(error = ?err, "menu action failed");
                    writeln!(self.out, "Error: {err:#}")?;
                }
            }
        }
    }

    /// Print `label`, then read one trimmed line. `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn setup(&mut self) -> Result<Flow> {
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        let Some(ip) = self.prompt("Enter the target IP")? else {
            return Ok(Flow::Exit);
        };
        workflow::run_setup(self.ctx, &name, &ip, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn vpn(&mut self) -> Result<Flow> {
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        workflow::run_vpn(self.ctx, &name, false, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn scenarios(&mut self) -> Result<Flow> {
        let summaries = list_scenarios(&self.ctx.paths)?;
        if summaries.is_empty() {
            writeln!(self.out, "\nNo scenarios available.")?;
            return Ok(Flow::Continue);
        }
        writeln!(self.out, "\nAvailable Scenarios:")?;
        for (idx, summary) in summaries.iter().enumerate() {
            writeln!(
                self.out,
                "{}. {} - {}",
                idx + 1,
                summary.name,
                summary.description
            )?;
        }
        let Some(choice) = self.prompt("\nSelect a scenario to run (number)")? else {
            return Ok(Flow::Exit);
        };
        let Some(summary) = pick(&summaries, &choice) else {
            writeln!(self.out, "Invalid choice. Returning to menu.")?;
            return Ok(Flow::Continue);
        };
        let document = load_scenario(&self.ctx.paths, &summary.id)?;
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        let challenge = self.ctx.challenge_dir(&name)?;

        writeln!(self.out, "\nScenario Summary:")?;
        for task in document.tasks.iter().flatten() {
            writeln!(self.out, "- {}: {}", task.name, task.command)?;
        }
        let Some(confirm) = self.prompt("\nProceed with this scenario? (y/n)")? else {
            return Ok(Flow::Exit);
        };
        if !confirm.eq_ignore_ascii_case("y") {
            writeln!(self.out, "Scenario execution canceled.")?;
            return Ok(Flow::Continue);
        }

        let runner = self.ctx.runner();
        let engine = ScenarioEngine::new(&self.ctx.paths, &runner);
        let result = engine.run(ScenarioSource::Document(document), &challenge)?;
        workflow::print_scenario_result(&result, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn tools(&mut self) -> Result<Flow> {
        let Some(tool) = self.prompt("Enter the tool name (e.g., nmap, gobuster)")? else {
            return Ok(Flow::Exit);
        };
        let tool = tool.to_lowercase();
        let config = self.ctx.store.load_tool(&tool)?;
        if config.presets.is_empty() {
            writeln!(self.out, "Tool '{tool}' has no presets.")?;
            return Ok(Flow::Continue);
        }
        writeln!(self.out, "\nAvailable presets for {tool}:")?;
        workflow::run_presets(self.ctx, Some(&tool), &mut self.out)?;
        let Some(choice) = self.prompt("\nSelect a preset (number)")? else {
            return Ok(Flow::Exit);
        };
        let Some(preset) = pick(&config.presets, &choice) else {
            writeln!(self.out, "Invalid choice. Returning to menu.")?;
            return Ok(Flow::Continue);
        };
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        workflow::run_tool(self.ctx, &tool, &preset.name, &name, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn report(&mut self) -> Result<Flow> {
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        workflow::run_report(self.ctx, &name, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn validate(&mut self) -> Result<Flow> {
        workflow::run_validate(self.ctx, false, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn flag(&mut self) -> Result<Flow> {
        let Some(name) = self.prompt("Enter the challenge name")? else {
            return Ok(Flow::Exit);
        };
        let Some(flag) = self.prompt("Enter the flag")? else {
            return Ok(Flow::Exit);
        };
        workflow::run_flag(self.ctx, &name, &flag, &mut self.out)?;
        Ok(Flow::Continue)
    }

    fn check(&mut self) -> Result<Flow> {
        workflow::run_tools(self.ctx, false, &mut self.out)?;
        Ok(Flow::Continue)
    }
}

/// 1-based selection from a list.
fn pick<'a, T>(items: &'a [T], choice: &str) -> Option<&'a T> {
    let index: usize = choice.trim().parse().ok()?;
    items.get(index.checked_sub(1)?)
}
