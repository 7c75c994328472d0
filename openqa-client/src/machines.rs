//! Machine operations.

use crate::client::Instance;
use crate::envelope;
use crate::error::Result;
use crate::settings::FormBody;
use crate::types::{Machine, WireMachine};

impl Instance {
    /// List all machines.
    pub async fn get_machines(&self) -> Result<Vec<Machine>> {
        self.fetch_machines(&self.url("machines")).await
    }

    /// Get one machine.
    pub async fn get_machine(&self, id: i64) -> Result<Machine> {
        let machines = self.fetch_machines(&self.url(&format!("machines/{}", id))).await?;
        envelope::first(machines, format_args!("machine {}", id))
    }

    /// Create a machine, or update it if `machine.id` is set.
    ///
    /// Name, backend and settings travel on the query string, which is what
    /// openQA reads today. The same machine is also sent as a JSON body with
    /// settings in list form.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`](crate::ClientError::Configuration)
    /// if no API key and secret are set.
    pub async fn post_machine(&self, machine: &Machine) -> Result<Machine> {
        self.require_credentials()?;

        let base = if machine.id == 0 {
            self.url("machines")
        } else {
            self.url(&format!("machines/{}", machine.id))
        };
        let url = format!("{}?{}", base, machine_query(machine).encode());
        let body = serde_json::to_vec(&WireMachine::from(machine))?;

        let response = self.post(&url, Some(body)).await?;
        self.trace_body("post_machine", &response);
        envelope::overlay(machine, &response)
    }

    /// Delete a machine.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`](crate::ClientError::Configuration)
    /// if no API key and secret are set.
    pub async fn delete_machine(&self, id: i64) -> Result<()> {
        self.require_credentials()?;
        let body = self.delete(&self.url(&format!("machines/{}", id))).await?;
        self.trace_body("delete_machine", &body);
        Ok(())
    }

    async fn fetch_machines(&self, url: &str) -> Result<Vec<Machine>> {
        let body = self.get(url).await?;
        let machines: Vec<WireMachine> = envelope::MACHINES.decode_many(&body)?;
        Ok(machines.into_iter().map(Machine::from).collect())
    }
}

fn machine_query(machine: &Machine) -> FormBody {
    let mut form = FormBody::new()
        .with("backend", machine.backend.as_str())
        .with("name", machine.name.as_str());
    form.push_settings(&machine.settings);
    form
}
