use shadersim_core::config::{SchedulerKind, ShaderConfig};

/// Fluent builder over `ShaderConfig::default()`.
pub struct ConfigBuilder(ShaderConfig);

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self(ShaderConfig::default())
    }

    /// Executable threads, input buffers and group size in one call.
    pub fn table(mut self, threads: u32, input_buffers: u32, group: u32) -> Self {
        self.0.threads.num_threads = threads;
        self.0.threads.input_buffers = input_buffers;
        self.0.threads.thread_group = group;
        self
    }

    pub fn resources(mut self, resources: u32) -> Self {
        self.0.threads.resources = resources;
        self
    }

    pub fn unified(mut self, unified: bool) -> Self {
        self.0.threads.unified = unified;
        self
    }

    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.0.fetch.set_scheduler(kind);
        self
    }

    pub fn swap_on_block(mut self) -> Self {
        self.0.fetch.swap_on_block = true;
        self
    }

    pub fn lock_step(mut self, enable: bool) -> Self {
        self.0.fetch.lock_step = enable;
        self
    }

    pub fn rates(mut self, threads_per_cycle: u32, instr_per_cycle: u32) -> Self {
        self.0.fetch.threads_per_cycle = threads_per_cycle;
        self.0.fetch.instr_per_cycle = instr_per_cycle;
        self
    }

    /// Scalar ALU mode; implies two instructions per thread-cycle.
    pub fn scalar_alu(mut self) -> Self {
        self.0.fetch.scalar_alu = true;
        self.0.fetch.instr_per_cycle = 2;
        self
    }

    pub fn fetch_delay(mut self, delay: u64) -> Self {
        self.0.fetch.fetch_delay = delay;
        self
    }

    pub fn max_thread_instructions(mut self, limit: u32) -> Self {
        self.0.fetch.max_thread_instructions = limit;
        self
    }

    pub fn transmission_latency(mut self, cycles_per_output: f64) -> Self {
        self.0.output.output_transmission_latency = cycles_per_output;
        self
    }

    pub fn output_latency(mut self, cycles: u64) -> Self {
        self.0.output.output_latency = cycles;
        self
    }

    pub fn texture_units(mut self, units: u32) -> Self {
        self.0.texture.units = units;
        self
    }

    pub fn build(self) -> ShaderConfig {
        self.0
    }
}
