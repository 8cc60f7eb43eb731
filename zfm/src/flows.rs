//! Orchestrator flows
//!
//! Each top-level operation is a bounded-retry state machine built from
//! steps: clear the signal, send one command, wait for the correlated
//! outcome. Only one flow runs at a time; every flow starts by purging
//! residue from the previous one.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use zfm_core::{
    constants::{CHAR_BUFFER_1, CHAR_BUFFER_2, LIBRARY_CAPACITY, PAGE_SLOTS},
    Command, StatusCode,
};
use zfm_types::{IndexTable, SearchMatch, SystemParameters};

use crate::{
    error::{EnrollError, Error, FlowError, VerifyError},
    signal::StepOutcome,
    Engine,
};

/// Attempts before a flow gives up
pub const MAX_ATTEMPTS: u32 = 3;

const CHECK_LOCATION_WAIT: Duration = Duration::from_secs(2);
const FINGER_WAIT: Duration = Duration::from_secs(1);
const CAPTURE_WAIT: Duration = Duration::from_secs(2);
const MODEL_WAIT: Duration = Duration::from_secs(2);
const SEARCH_WAIT: Duration = Duration::from_secs(3);
const STORE_WAIT: Duration = Duration::from_secs(2);
const DELETE_WAIT: Duration = Duration::from_secs(2);
const CLEAR_WAIT: Duration = Duration::from_secs(5);
const PASSWORD_WAIT: Duration = Duration::from_secs(2);
const READ_WAIT: Duration = Duration::from_secs(2);

/// Absolute finger deadline per verification attempt
const VERIFY_FINGER_DEADLINE: Duration = Duration::from_secs(5);

const REMOVAL_POLLS: u32 = 20;
const REMOVAL_SPACING: Duration = Duration::from_millis(500);
const FINGER_POLL_DELAY: Duration = Duration::from_millis(200);
const RETRY_DELAY: Duration = Duration::from_millis(200);

fn full_range_search() -> [u8; 5] {
    let [count_hi, count_lo] = LIBRARY_CAPACITY.to_be_bytes();
    [CHAR_BUFFER_1, 0x00, 0x00, count_hi, count_lo]
}

impl Engine {
    /// Enroll a finger at `location`
    ///
    /// Checks occupancy, captures the finger twice with a removal in
    /// between, merges the captures, rejects duplicates, and stores the
    /// model. Step failures restart from the finger wait; three failed
    /// attempts end the flow. A send failure aborts immediately.
    pub async fn enroll(&self, location: u16) -> std::result::Result<(), EnrollError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();
        info!(location, "starting enrollment");

        // CheckLocation: occupancy is an ordinary return value, no retry
        let page = (location / PAGE_SLOTS) as u8;
        let slot = (location % PAGE_SLOTS) as u8;
        let table = self.fetch_index_table(page).await?;
        if table.is_occupied(slot) {
            warn!(location, "enrollment target occupied");
            return Err(EnrollError::LocationOccupied(location));
        }

        let mut attempts = 0u32;
        while attempts < MAX_ATTEMPTS {
            debug!(attempt = attempts + 1, "enrollment pass");

            // First capture
            self.await_finger().await?;
            if !self.step_ok(Command::Img2Tz, &[CHAR_BUFFER_1], CAPTURE_WAIT).await? {
                attempts += 1;
                continue;
            }

            // The same finger twice in a row reads as one long touch
            if !self.await_removal().await? {
                attempts += 1;
                continue;
            }

            // Second capture
            self.await_finger().await?;
            if !self.step_ok(Command::Img2Tz, &[CHAR_BUFFER_2], CAPTURE_WAIT).await? {
                attempts += 1;
                continue;
            }

            if !self.step_ok(Command::RegModel, &[], MODEL_WAIT).await? {
                attempts += 1;
                continue;
            }

            // A library hit here means this finger is already enrolled
            match self.step(Command::Search, &full_range_search(), SEARCH_WAIT).await? {
                Some(outcome) if outcome.success => {
                    let found = SearchMatch::parse(&outcome.packet.params).ok();
                    warn!(?found, "duplicate template, restarting");
                    attempts += 1;
                    continue;
                }
                Some(_) => {}
                None => {
                    attempts += 1;
                    continue;
                }
            }

            let [loc_hi, loc_lo] = location.to_be_bytes();
            if self
                .step_ok(Command::Store, &[CHAR_BUFFER_1, loc_hi, loc_lo], STORE_WAIT)
                .await?
            {
                info!(location, "enrollment complete");
                return Ok(());
            }
            attempts += 1;
        }

        warn!(location, attempts, "enrollment failed");
        Err(EnrollError::Failed(attempts))
    }

    /// Verify a finger against the whole library
    ///
    /// Waits up to five seconds per attempt for a finger before
    /// capturing and searching; no capture command goes out until a
    /// finger is present.
    pub async fn verify(&self) -> std::result::Result<SearchMatch, VerifyError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();
        info!("starting verification");

        let mut attempts = 0u32;
        while attempts < MAX_ATTEMPTS {
            debug!(attempt = attempts + 1, "verification pass");

            if !self.await_finger_within(VERIFY_FINGER_DEADLINE).await? {
                attempts += 1;
                sleep(RETRY_DELAY).await;
                continue;
            }

            if !self.step_ok(Command::Img2Tz, &[CHAR_BUFFER_1], FINGER_WAIT).await? {
                attempts += 1;
                sleep(RETRY_DELAY).await;
                continue;
            }

            if let Some(outcome) = self.step(Command::Search, &full_range_search(), SEARCH_WAIT).await? {
                if outcome.success {
                    let found =
                        SearchMatch::parse(&outcome.packet.params).map_err(FlowError::from)?;
                    info!(page_id = found.page_id, score = found.score, "match found");
                    return Ok(found);
                }
            }

            attempts += 1;
            sleep(RETRY_DELAY).await;
        }

        warn!(attempts, "verification failed");
        Err(VerifyError::Failed(attempts))
    }

    /// Delete the template at `location`
    pub async fn delete(&self, location: u16) -> std::result::Result<(), FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();
        info!(location, "deleting template");

        let [loc_hi, loc_lo] = location.to_be_bytes();
        self.expect_ok(Command::DeletChar, &[loc_hi, loc_lo, 0x00, 0x01], DELETE_WAIT)
            .await
    }

    /// Clear the whole template library
    pub async fn clear_database(&self) -> std::result::Result<(), FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();
        warn!("clearing template library");

        self.expect_ok(Command::Empty, &[], CLEAR_WAIT).await
    }

    /// Verify the module password
    pub async fn verify_password(&self, password: u32) -> std::result::Result<(), FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();

        self.expect_ok(Command::VfyPwd, &password.to_be_bytes(), PASSWORD_WAIT)
            .await
    }

    /// Read status and basic configuration
    pub async fn read_system_parameters(
        &self,
    ) -> std::result::Result<SystemParameters, FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();

        let outcome = self.expect_outcome(Command::ReadSysPara, &[], READ_WAIT).await?;
        Ok(SystemParameters::parse(&outcome.packet.params)?)
    }

    /// Read the count of stored templates
    pub async fn template_count(&self) -> std::result::Result<u16, FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();

        let outcome = self.expect_outcome(Command::TemplateNum, &[], READ_WAIT).await?;
        match outcome.packet.params.as_ref() {
            [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
            short => Err(FlowError::Payload(zfm_types::Error::Truncated {
                what: "template count",
                expected: 2,
                actual: short.len(),
            })),
        }
    }

    /// Read one page of the occupancy index table
    pub async fn read_index_table(&self, page: u8) -> std::result::Result<IndexTable, FlowError> {
        let _flow = self.flow_lock().lock().await;
        self.reset_flow_state();
        self.fetch_index_table(page).await
    }

    // Step helpers

    /// One step: clear the signal, send, wait for the outcome
    async fn step(
        &self,
        command: Command,
        params: &[u8],
        wait: Duration,
    ) -> std::result::Result<Option<StepOutcome>, Error> {
        self.signal().clear();
        self.send(command, params).await?;
        Ok(self.signal().wait(wait).await)
    }

    /// Step that only cares whether the module confirmed success
    async fn step_ok(
        &self,
        command: Command,
        params: &[u8],
        wait: Duration,
    ) -> std::result::Result<bool, Error> {
        Ok(self
            .step(command, params, wait)
            .await?
            .is_some_and(|outcome| outcome.success))
    }

    /// Step whose non-success or absence is a flow error
    async fn expect_outcome(
        &self,
        command: Command,
        params: &[u8],
        wait: Duration,
    ) -> std::result::Result<StepOutcome, FlowError> {
        match self.step(command, params, wait).await? {
            Some(outcome) if outcome.success => Ok(outcome),
            Some(outcome) => Err(FlowError::Rejected(outcome.status)),
            None => Err(FlowError::Timeout),
        }
    }

    async fn expect_ok(
        &self,
        command: Command,
        params: &[u8],
        wait: Duration,
    ) -> std::result::Result<(), FlowError> {
        self.expect_outcome(command, params, wait).await.map(|_| ())
    }

    async fn fetch_index_table(&self, page: u8) -> std::result::Result<IndexTable, FlowError> {
        let outcome = self
            .expect_outcome(Command::ReadIndexTable, &[page], CHECK_LOCATION_WAIT)
            .await?;
        Ok(IndexTable::parse(&outcome.packet.params)?)
    }

    /// Poll GenImg until a finger is captured; unbounded, since only
    /// later step failures count against the flow's attempts
    async fn await_finger(&self) -> std::result::Result<(), Error> {
        loop {
            if let Some(outcome) = self.step(Command::GenImg, &[], FINGER_WAIT).await? {
                if outcome.success {
                    return Ok(());
                }
            }
            sleep(FINGER_POLL_DELAY).await;
        }
    }

    /// Poll GenImg until a finger is captured or `limit` expires
    async fn await_finger_within(&self, limit: Duration) -> std::result::Result<bool, Error> {
        let deadline = Instant::now() + limit;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let wait = FINGER_WAIT.min(deadline - now);
            if let Some(outcome) = self.step(Command::GenImg, &[], wait).await? {
                if outcome.success {
                    return Ok(true);
                }
            }
            sleep(FINGER_POLL_DELAY).await;
        }
    }

    /// Poll until the finger leaves the sensor; `false` after twenty
    /// polls with the finger still present
    async fn await_removal(&self) -> std::result::Result<bool, Error> {
        for _ in 0..REMOVAL_POLLS {
            if let Some(outcome) = self.step(Command::GenImg, &[], FINGER_WAIT).await? {
                if outcome.status == StatusCode::NoFinger {
                    return Ok(true);
                }
            }
            sleep(REMOVAL_SPACING).await;
        }
        debug!("finger never removed");
        Ok(false)
    }
}
