//! Shader core statistics collection and reporting.
//!
//! This module tracks the counters produced by the fetch and decode-execute boxes. It provides:
//! 1. **Fetch:** Fetched, re-fetched and faked instructions, inputs and outputs.
//! 2. **Control:** Block, unblock, end, replay and z-export commands.
//! 3. **Execution:** Executed, blocked and removed instructions and texture requests.
//! 4. **Occupancy:** Per-cycle sums of ready, blocked, finished and free threads and used resources.

use std::time::Instant;

use serde::Serialize;

/// Shader core statistics.
///
/// Counters are plain `u64` values updated by the boxes during `clock`. Occupancy fields are
/// sums over cycles; divide by `cycles` for the average.
#[derive(Clone, Debug, Serialize)]
pub struct ShaderStats {
    #[serde(skip)]
    start_time: Instant,
    /// Total simulated cycles.
    pub cycles: u64,

    /// Instructions fetched (real fetches only).
    pub fetched: u64,
    /// Instructions scheduled for re-fetch by a replay request.
    pub refetched: u64,
    /// Faked fetches discarded by the decode box.
    pub faked: u64,
    /// Work items admitted.
    pub inputs: u64,
    /// Finished threads transmitted to the consumer.
    pub outputs: u64,
    /// Sum of active input attributes over admitted work items.
    pub input_attributes: u64,
    /// Sum of per-thread resource costs over admitted work items.
    pub input_registers: u64,

    /// Block commands sent by decode.
    pub blocks: u64,
    /// Unblock commands sent by decode.
    pub unblocks: u64,
    /// End commands sent by decode.
    pub ends: u64,
    /// Replay (repeat last) commands sent by decode.
    pub replays: u64,
    /// Z-export commands sent by decode.
    pub zexports: u64,
    /// Texture requests dispatched to texture units.
    pub texture_requests: u64,

    /// Instructions that completed execution.
    pub executed: u64,
    /// Instructions held in the decode buffer behind a stalled group member.
    pub blocked_instructions: u64,
    /// Instructions discarded by decode (dependences, ignored group members, dropped threads).
    pub removed_instructions: u64,

    /// Sum over cycles of ready threads.
    pub ready_thread_cycles: u64,
    /// Sum over cycles of blocked or staged threads.
    pub blocked_thread_cycles: u64,
    /// Sum over cycles of ending or draining threads.
    pub finished_thread_cycles: u64,
    /// Sum over cycles of free slots.
    pub free_thread_cycles: u64,
    /// Sum over cycles of allocated resource units.
    pub used_resource_cycles: u64,

    /// Cycles where every slot was free.
    pub empty_cycles: u64,
    /// Cycles where at least one instruction was sent to decode.
    pub fetch_cycles: u64,
    /// Cycles where decode was ready but no group could be fetched.
    pub no_ready_cycles: u64,
}

impl Default for ShaderStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            fetched: 0,
            refetched: 0,
            faked: 0,
            inputs: 0,
            outputs: 0,
            input_attributes: 0,
            input_registers: 0,
            blocks: 0,
            unblocks: 0,
            ends: 0,
            replays: 0,
            zexports: 0,
            texture_requests: 0,
            executed: 0,
            blocked_instructions: 0,
            removed_instructions: 0,
            ready_thread_cycles: 0,
            blocked_thread_cycles: 0,
            finished_thread_cycles: 0,
            free_thread_cycles: 0,
            used_resource_cycles: 0,
            empty_cycles: 0,
            fetch_cycles: 0,
            no_ready_cycles: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"fetch"`, `"control"`, `"execute"`, `"occupancy"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "fetch", "control", "execute", "occupancy"];

impl ShaderStats {
    /// Serializes the counters as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = self.cycles.max(1) as f64;

        if want("summary") {
            let khz = if seconds > 0.0 { (self.cycles as f64 / seconds) / 1000.0 } else { 0.0 };
            println!("\n==========================================================");
            println!("SHADER CORE SIMULATION STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {seconds:.4} s");
            println!("sim_cycles               {}", self.cycles);
            println!("sim_freq                 {khz:.2} kHz");
            println!("sim_inputs               {}", self.inputs);
            println!("sim_outputs              {}", self.outputs);
            println!("sim_ipc                  {:.4}", self.executed as f64 / cyc);
            println!("----------------------------------------------------------");
        }
        if want("fetch") {
            println!("FETCH");
            println!("  fetch.instructions     {}", self.fetched);
            println!("  fetch.refetched        {}", self.refetched);
            println!("  fetch.faked            {}", self.faked);
            println!(
                "  fetch.active_cycles    {} ({:.2}%)",
                self.fetch_cycles,
                (self.fetch_cycles as f64 / cyc) * 100.0
            );
            println!(
                "  fetch.no_ready_cycles  {} ({:.2}%)",
                self.no_ready_cycles,
                (self.no_ready_cycles as f64 / cyc) * 100.0
            );
            println!("----------------------------------------------------------");
        }
        if want("control") {
            println!("CONTROL");
            println!("  ctl.blocks             {}", self.blocks);
            println!("  ctl.unblocks           {}", self.unblocks);
            println!("  ctl.ends               {}", self.ends);
            println!("  ctl.replays            {}", self.replays);
            println!("  ctl.zexports           {}", self.zexports);
            println!("----------------------------------------------------------");
        }
        if want("execute") {
            println!("EXECUTE");
            println!("  exec.instructions      {}", self.executed);
            println!("  exec.blocked           {}", self.blocked_instructions);
            println!("  exec.removed           {}", self.removed_instructions);
            println!("  exec.texture_requests  {}", self.texture_requests);
            println!("----------------------------------------------------------");
        }
        if want("occupancy") {
            println!("OCCUPANCY (average per cycle)");
            println!("  threads.ready          {:.2}", self.ready_thread_cycles as f64 / cyc);
            println!("  threads.blocked        {:.2}", self.blocked_thread_cycles as f64 / cyc);
            println!("  threads.finished       {:.2}", self.finished_thread_cycles as f64 / cyc);
            println!("  threads.free           {:.2}", self.free_thread_cycles as f64 / cyc);
            println!("  resources.used         {:.2}", self.used_resource_cycles as f64 / cyc);
            println!(
                "  cycles.empty           {} ({:.2}%)",
                self.empty_cycles,
                (self.empty_cycles as f64 / cyc) * 100.0
            );
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
