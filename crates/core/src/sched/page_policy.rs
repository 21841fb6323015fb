//! DPM page-policy arbitration.
//!
//! Every 1000 cycles, each bank's row-hit ratio decides whether the bank
//! keeps its rows open or switches to auto-precharge closure. A 4-state
//! hysteresis counter per bank damps the decision: values 2–3 mean
//! OPEN_PAGE, 0–1 mean SMART_CLOSE. Strong signals (ratio below 1/4 or at
//! least 3/4) saturate the counter immediately; weak signals move it one
//! step.
//!
//! Hit counters are not reset here; they accumulate until refresh completion
//! clears them, so the ratio is a running average over the refresh period.

use crate::config::RowBufPolicy;

use super::command_queue::{CommandQueue, ARBITRATION_PERIOD};

impl CommandQueue {
    /// Re-evaluates per-bank page policy on the fixed arbitration period.
    ///
    /// No-op outside the arbitration cycle (`clk % 1000 == 0`, first window
    /// at `clk = 1000`) and in every channel-level policy other than DPM.
    pub fn arbitrate_page_policy(&mut self) {
        if self.clk() % ARBITRATION_PERIOD != 0 || self.clk() < ARBITRATION_PERIOD {
            return;
        }
        if self.channel_policy() != RowBufPolicy::Dpm {
            return;
        }

        log::debug!(
            "ch{} dpm: true_row_hit={:?} demand_row_hit={:?} total={:?}",
            self.channel(),
            self.true_row_hit_count,
            self.demand_row_hit_count,
            self.total_command_count,
        );

        for i in 0..self.num_queues() {
            let hits = self.true_row_hit_count[i];
            let total = self.total_command_count[i];
            match self.row_buf_policy[i] {
                RowBufPolicy::OpenPage => {
                    // An idle bank (total == 0) reads as ratio zero.
                    if total == 0 || hits < total >> 2 {
                        self.bank_sm[i] = 0;
                    } else if hits < total >> 1 {
                        self.bank_sm[i] = self.bank_sm[i].saturating_sub(1);
                    } else {
                        self.bank_sm[i] = (self.bank_sm[i] + 1).min(3);
                    }
                    self.row_buf_policy[i] = if self.bank_sm[i] <= 1 {
                        RowBufPolicy::SmartClose
                    } else {
                        RowBufPolicy::OpenPage
                    };
                }
                RowBufPolicy::SmartClose => {
                    if total > 0 && hits as f64 >= 0.75 * total as f64 {
                        self.bank_sm[i] = 3;
                    } else if total == 0 || hits < total >> 1 {
                        self.bank_sm[i] = self.bank_sm[i].saturating_sub(1);
                    } else {
                        self.bank_sm[i] = (self.bank_sm[i] + 1).min(3);
                    }
                    self.row_buf_policy[i] = if self.bank_sm[i] >= 2 {
                        RowBufPolicy::OpenPage
                    } else {
                        RowBufPolicy::SmartClose
                    };
                }
                // CLOSE_PAGE is a static selection; nothing adapts.
                _ => {}
            }
        }

        let map: String = self
            .row_buf_policy
            .iter()
            .map(|p| if *p == RowBufPolicy::OpenPage { 'O' } else { '#' })
            .collect();
        log::debug!("ch{} dpm: policy map {}", self.channel(), map);
    }
}
