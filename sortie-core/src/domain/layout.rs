//! Object key layout
//!
//! ```text
//! manifest.json                                      current job pointer (mutable)
//! do_stuff.sh                                        compiled startup script
//! jobs/<job>/resources/<file>                        job inputs
//! jobs/<job>/resources/sortie_manifest.json          frozen job record
//! jobs/<job>/results/<file>.<iteration>.<instance>   result objects
//! jobs/<job>/results/sortie_results.json             aggregate record
//! jobs/<job>/logs/<instance>.<logfile>               node logs
//! jobs/<job>/checkpoints/<instance>.<i>-<name>-<ph>  node progress markers
//! jobs/<job>/terminate/<instance>                    termination marker
//! ```

use super::checkpoint::Checkpoint;

/// Mutable pointer to the manifest of the job being started
pub const MANIFEST_KEY: &str = "manifest.json";

/// Startup script fetched by every node at boot, overwritten per job
pub const STARTUP_SCRIPT_KEY: &str = "do_stuff.sh";

/// File name of the frozen job record under the job's resources
pub const FROZEN_MANIFEST_NAME: &str = "sortie_manifest.json";

/// File name of the aggregate record under the job's results
pub const AGGREGATE_NAME: &str = "sortie_results.json";

/// Top-level prefix every job lives under
pub const JOBS_PREFIX: &str = "jobs/";

/// Node log files shipped after every iteration, relative to `/var/log`
pub const NODE_LOG_FILES: [&str; 3] = ["cloud-init.log", "cloud-init-output.log", "syslog"];

/// Key builder for everything scoped to one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKeys {
    job: String,
}

impl JobKeys {
    pub fn new(job: impl Into<String>) -> Self {
        Self { job: job.into() }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// `jobs/<job>/`
    pub fn job_prefix(&self) -> String {
        format!("{}{}/", JOBS_PREFIX, self.job)
    }

    pub fn resources_prefix(&self) -> String {
        format!("{}resources/", self.job_prefix())
    }

    pub fn resource(&self, file: &str) -> String {
        format!("{}{}", self.resources_prefix(), file)
    }

    /// Immutable snapshot of the manifest this job was started with
    pub fn frozen_manifest(&self) -> String {
        self.resource(FROZEN_MANIFEST_NAME)
    }

    pub fn results_prefix(&self) -> String {
        format!("{}results/", self.job_prefix())
    }

    pub fn result(&self, file: &str, iteration: u32, instance: &str) -> String {
        format!("{}{}.{}.{}", self.results_prefix(), file, iteration, instance)
    }

    pub fn aggregate(&self) -> String {
        format!("{}{}", self.results_prefix(), AGGREGATE_NAME)
    }

    pub fn logs_prefix(&self) -> String {
        format!("{}logs/", self.job_prefix())
    }

    pub fn log(&self, instance: &str, logfile: &str) -> String {
        format!("{}{}.{}", self.logs_prefix(), instance, logfile)
    }

    pub fn checkpoint(&self, instance: &str, checkpoint: &Checkpoint) -> String {
        format!(
            "{}checkpoints/{}.{}",
            self.job_prefix(),
            instance,
            checkpoint.key_suffix()
        )
    }

    pub fn terminate(&self, instance: &str) -> String {
        format!("{}terminate/{}", self.job_prefix(), instance)
    }
}
