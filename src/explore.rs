// lmctl - CLI for the LogicMonitor REST API
// Copyright (C) 2026 The lmctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The interactive drill-down: devices, then one device's data sources, then
//! one data source's instances.
//!
//! Each stage fetches, renders and (for the last two) persists its items,
//! then asks whether to go one level deeper. Any answer other than `y` ends
//! the run. There is no way back up a level.

use crate::client::{ApiClient, DEVICES_PATH, MAX_PAGE_SIZE, datasources_path, instances_path};
use crate::error::ApiError;
use crate::models::{DataSourceInstance, Device, DeviceDataSource};
use crate::output::{self, DATASOURCES_FILE, INSTANCES_FILE};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{info, warn};

pub const PROMPT_PROCEED_DEVICE: &str = "Do you want to proceed with inserting a device ID? (y/n)";
pub const PROMPT_DEVICE_ID: &str = "Enter the device ID";
pub const PROMPT_PROCEED_INSTANCES: &str =
    "Do you want to proceed with getting the datasource instances data? (y/n)";
pub const PROMPT_DATASOURCE_ID: &str = "Enter the datasource ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    ListDevices,
    ListDataSources {
        device_id: String,
    },
    ListInstances {
        device_id: String,
        datasource_id: String,
    },
    Done,
}

pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Where the explorer gets its answers from.
pub trait Prompter {
    fn input(&mut self, prompt: &str) -> Result<String>;

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(is_yes(&self.input(prompt)?))
    }
}

/// Reads answers from the terminal, or line by line from piped stdin.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        if io::stdin().is_terminal() {
            let answer = dialoguer::Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .context("reading answer")?;
            return Ok(answer.trim().to_string());
        }

        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}: ")?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading answer from stdin")?;
        Ok(line.trim().to_string())
    }
}

/// Answers supplied up front on the command line. A preset ID also counts as
/// a "yes" to the question before it.
#[derive(Debug, Clone, Default)]
pub struct Presets {
    pub device_id: Option<String>,
    pub datasource_id: Option<String>,
}

pub struct Explorer<'a, P, W> {
    client: &'a ApiClient,
    company: String,
    output_dir: PathBuf,
    prompter: P,
    out: W,
    presets: Presets,
    all_pages: bool,
}

impl<'a, P: Prompter, W: Write> Explorer<'a, P, W> {
    pub fn new(
        client: &'a ApiClient,
        company: &str,
        output_dir: PathBuf,
        prompter: P,
        out: W,
    ) -> Self {
        Self {
            client,
            company: company.to_string(),
            output_dir,
            prompter,
            out,
            presets: Presets::default(),
            all_pages: false,
        }
    }

    pub fn with_presets(mut self, presets: Presets) -> Self {
        self.presets = presets;
        self
    }

    pub fn all_pages(mut self, all_pages: bool) -> Self {
        self.all_pages = all_pages;
        self
    }

    /// Drive the state machine from `start` until it reaches [`Stage::Done`].
    pub fn run(&mut self, start: Stage) -> Result<()> {
        let mut stage = start;
        while stage != Stage::Done {
            stage = self.step(stage)?;
        }
        Ok(())
    }

    pub fn step(&mut self, stage: Stage) -> Result<Stage> {
        match stage {
            Stage::ListDevices => {
                self.show_devices()?;
                let preset = self.presets.device_id.take();
                match self.next_id(
                    preset,
                    PROMPT_PROCEED_DEVICE,
                    PROMPT_DEVICE_ID,
                    "Exiting without inserting a device ID.",
                )? {
                    Some(device_id) => Ok(Stage::ListDataSources { device_id }),
                    None => Ok(Stage::Done),
                }
            }
            Stage::ListDataSources { device_id } => {
                self.show_datasources(&device_id)?;
                let preset = self.presets.datasource_id.take();
                match self.next_id(
                    preset,
                    PROMPT_PROCEED_INSTANCES,
                    PROMPT_DATASOURCE_ID,
                    "Exiting without getting the data source instances data.",
                )? {
                    Some(datasource_id) => Ok(Stage::ListInstances {
                        device_id,
                        datasource_id,
                    }),
                    None => Ok(Stage::Done),
                }
            }
            Stage::ListInstances {
                device_id,
                datasource_id,
            } => {
                self.show_instances(&device_id, &datasource_id)?;
                writeln!(self.out, "Done!")?;
                Ok(Stage::Done)
            }
            Stage::Done => Ok(Stage::Done),
        }
    }

    pub fn show_devices(&mut self) -> Result<()> {
        let url = format!("{}{}", self.client.base_url(), DEVICES_PATH);
        writeln!(
            self.out,
            "{}",
            output::banner("LogicMonitor - Get Devices", &self.company, &url)
        )?;

        let items = if self.all_pages {
            self.client.list_all_devices(MAX_PAGE_SIZE)?
        } else {
            self.client.list_devices()?.items
        };

        let rows = items
            .iter()
            .map(|item| decode::<Device>(item, DEVICES_PATH).map(|d| d.to_row()))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = rows.len(), "listed devices");

        writeln!(self.out, "{}", output::render_grid(&rows))?;
        Ok(())
    }

    pub fn show_datasources(&mut self, device_id: &str) -> Result<()> {
        let path = datasources_path(device_id);
        let items = self.client.device_datasources(device_id)?.items;
        if items.is_empty() {
            warn!(device_id, "device returned no data sources");
        }

        let progress =
            ProgressBar::with_draw_target(Some(items.len() as u64), ProgressDrawTarget::stdout());
        progress.set_style(ProgressStyle::with_template("Progress: {percent_precise}%")?);
        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            rows.push(decode::<DeviceDataSource>(item, &path)?.to_row());
            progress.inc(1);
        }
        progress.finish();

        output::write_items(&self.output_dir, DATASOURCES_FILE, &items)?;

        writeln!(self.out, "Extracted Data:")?;
        writeln!(self.out, "{}", output::render_pretty(&rows))?;
        Ok(())
    }

    pub fn show_instances(&mut self, device_id: &str, datasource_id: &str) -> Result<()> {
        let path = instances_path(device_id, datasource_id);
        let items = self
            .client
            .datasource_instances(device_id, datasource_id)?
            .items;

        let rows = items
            .iter()
            .map(|item| decode::<DataSourceInstance>(item, &path).map(|i| i.to_row()))
            .collect::<Result<Vec<_>, _>>()?;

        writeln!(self.out, "{}", output::render_grid(&rows))?;
        output::write_items(&self.output_dir, INSTANCES_FILE, &items)?;
        Ok(())
    }

    fn next_id(
        &mut self,
        preset: Option<String>,
        proceed_prompt: &str,
        id_prompt: &str,
        decline_message: &str,
    ) -> Result<Option<String>> {
        if let Some(id) = preset {
            return Ok(Some(id));
        }
        if !self.prompter.confirm(proceed_prompt)? {
            writeln!(self.out, "{decline_message}")?;
            return Ok(None);
        }
        let id = self.prompter.input(id_prompt)?;
        Ok(Some(id.trim().to_string()))
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

fn decode<'v, T: Deserialize<'v>>(item: &'v Value, path: &str) -> Result<T, ApiError> {
    T::deserialize(item).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use anyhow::anyhow;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Default)]
    struct ScriptedPrompter {
        answers: VecDeque<String>,
        asked: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for &mut ScriptedPrompter {
        fn input(&mut self, prompt: &str) -> Result<String> {
            self.asked.push(prompt.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| anyhow!("unexpected prompt: {prompt}"))
        }
    }

    fn client_for(server: &MockServer) -> ApiClient {
        let creds = Credentials {
            company: "acme".into(),
            access_id: "id".into(),
            access_key: "key".into(),
        };
        ApiClient::new(
            &format!("{}/santaba/rest", server.base_url()),
            creds,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn mock_devices(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET).path("/santaba/rest/device/devices");
            then.status(200).json_body(json!({"data": {"items": [{
                "id": 1,
                "name": "dev1",
                "displayName": "Device One",
                "autoProperties": [],
                "systemProperties": []
            }]}}));
        })
    }

    fn datasource_items() -> Value {
        json!([{
            "id": 900,
            "dataSourceId": 12,
            "dataSourceName": "Ping",
            "deviceName": "dev1",
            "deviceDisplayName": "Device One",
            "graphs": [{"id": 3, "name": "RTT"}]
        }])
    }

    #[test]
    fn walks_all_three_stages() {
        let server = MockServer::start();
        let devices = mock_devices(&server);
        let datasources = server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/1/devicedatasources");
            then.status(200)
                .json_body(json!({"data": {"items": datasource_items()}}));
        });
        let instances = server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/1/devicedatasources/900/instances");
            then.status(200).json_body(json!({"data": {"items": [{
                "deviceDataSourceId": 900,
                "name": "eth0",
                "deviceDisplayName": "Device One",
                "id": 5501,
                "dataSourceId": 12
            }]}}));
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::new(&["y", " 1 ", "Y", "900"]);
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        explorer.run(Stage::ListDevices).unwrap();
        let out = String::from_utf8(explorer.into_output()).unwrap();

        devices.assert();
        datasources.assert();
        instances.assert();
        assert_eq!(
            prompter.asked,
            vec![
                PROMPT_PROCEED_DEVICE,
                PROMPT_DEVICE_ID,
                PROMPT_PROCEED_INSTANCES,
                PROMPT_DATASOURCE_ID
            ]
        );
        assert!(out.contains("Device One"));
        assert!(out.contains("Extracted Data:"));
        assert!(out.contains("5501"));
        assert!(out.trim_end().ends_with("Done!"));

        let saved: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(DATASOURCES_FILE)).unwrap())
                .unwrap();
        assert_eq!(saved, datasource_items());
        assert!(dir.path().join(INSTANCES_FILE).exists());
    }

    #[test]
    fn declining_stops_before_next_call() {
        let server = MockServer::start();
        mock_devices(&server);
        let datasources = server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/1/devicedatasources");
            then.status(200).json_body(json!({"data": {"items": []}}));
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::new(&["yes"]);
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        explorer.run(Stage::ListDevices).unwrap();
        let out = String::from_utf8(explorer.into_output()).unwrap();

        datasources.assert_hits(0);
        assert!(out.contains("Exiting without inserting a device ID."));
        assert!(!dir.path().join(DATASOURCES_FILE).exists());
    }

    #[test]
    fn failed_datasources_call_writes_nothing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/77/devicedatasources");
            then.status(404);
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::default();
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        let err = explorer
            .step(Stage::ListDataSources {
                device_id: "77".into(),
            })
            .unwrap_err();

        assert_eq!(err.downcast_ref::<ApiError>().and_then(ApiError::status), Some(404));
        assert!(!dir.path().join(DATASOURCES_FILE).exists());
    }

    #[test]
    fn failed_instances_call_keeps_earlier_file_only() {
        let server = MockServer::start();
        mock_devices(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/1/devicedatasources");
            then.status(200)
                .json_body(json!({"data": {"items": datasource_items()}}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/1/devicedatasources/900/instances");
            then.status(500);
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::default();
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        )
        .with_presets(Presets {
            device_id: Some("1".into()),
            datasource_id: Some("900".into()),
        });

        let err = explorer.run(Stage::ListDevices).unwrap_err();

        assert_eq!(err.to_string(), "500");
        assert!(prompter.asked.is_empty());
        assert!(dir.path().join(DATASOURCES_FILE).exists());
        assert!(!dir.path().join(INSTANCES_FILE).exists());
    }

    #[test]
    fn empty_datasources_render_header_only() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/3/devicedatasources");
            then.status(200).json_body(json!({"data": {"items": []}}));
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::new(&["n"]);
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        let next = explorer
            .step(Stage::ListDataSources {
                device_id: "3".into(),
            })
            .unwrap();
        let out = String::from_utf8(explorer.into_output()).unwrap();

        assert_eq!(next, Stage::Done);
        assert!(out.contains("Data Source Name"));
        assert!(out.contains("Exiting without getting the data source instances data."));
        let raw = fs::read_to_string(dir.path().join(DATASOURCES_FILE)).unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn only_y_counts_as_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" Y\n"));
        assert!(!is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }

    #[test]
    fn saved_datasources_keep_key_order_and_exact_numbers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/santaba/rest/device/devices/4/devicedatasources");
            then.status(200).body(
                r#"{"data":{"items":[{"zeta":1,"dataSourceName":"Ping","alpha":2,"big":12345678901234567890123}]}}"#,
            );
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::new(&["n"]);
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        explorer
            .step(Stage::ListDataSources {
                device_id: "4".into(),
            })
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(DATASOURCES_FILE)).unwrap();
        let expected = "[\n    {\n        \"zeta\": 1,\n        \"dataSourceName\": \"Ping\",\n        \"alpha\": 2,\n        \"big\": 12345678901234567890123\n    }\n]";
        assert_eq!(raw, expected);
    }

    #[test]
    fn banner_precedes_failed_device_listing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/santaba/rest/device/devices");
            then.status(403);
        });

        let dir = tempdir().unwrap();
        let client = client_for(&server);
        let mut prompter = ScriptedPrompter::default();
        let mut explorer = Explorer::new(
            &client,
            "acme",
            dir.path().to_path_buf(),
            &mut prompter,
            Vec::new(),
        );
        let err = explorer.step(Stage::ListDevices).unwrap_err();
        let out = String::from_utf8(explorer.into_output()).unwrap();

        assert_eq!(err.downcast_ref::<ApiError>().and_then(ApiError::status), Some(403));
        assert!(out.contains("Company: acme"));
        assert!(out.contains(&format!("URL: {}/santaba/rest/device/devices", server.base_url())));
        assert!(prompter.asked.is_empty());
    }
}
