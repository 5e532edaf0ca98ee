//! Triggering the rainfall accumulation computation.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::{
    config::Config,
    errors::RadarDataErr,
    io::{run_logged, CommandOutput, CommandRunner, Invocation},
    zones::Zone,
};

const SCRIPT: &str = "./generate_radaric_mf_values_accumulations/main.py";
const LOG_NAME: &str = "generate-radaric-mf-values-accumulations";

/// A run of the accumulation script for one timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccumulationJob {
    /// Project holding the script and its environment.
    pub project: PathBuf,
    /// Timestamp of the newest tile to accumulate.
    pub timestamp: DateTime<Utc>,
    /// Limit to one zone, every zone otherwise.
    pub zone: Option<Zone>,
    /// Folder of the output and error logs, output captured otherwise.
    pub log_dir: Option<PathBuf>,
}

impl AccumulationJob {
    /// Build the `poetry run` command line.
    pub fn to_invocation(&self) -> Invocation {
        let mut invocation = Invocation::new("poetry")
            .arg("run")
            .arg("python")
            .arg(SCRIPT)
            .arg("--timestamp")
            .arg(self.timestamp.timestamp().to_string())
            .current_dir(&self.project);

        if let Some(zone) = self.zone {
            invocation = invocation.arg("--zone").arg(zone.as_static_str());
        }

        if let Some(ref log_dir) = self.log_dir {
            invocation = invocation.append_output_to(
                &log_dir.join(format!("{}.log", LOG_NAME)),
                &log_dir.join(format!("{}.error.log", LOG_NAME)),
            );
        }

        invocation
    }
}

/// Update the accumulations of `zone` up to `timestamp`.
pub fn compute_for_zone(
    config: &Config,
    runner: &mut dyn CommandRunner,
    zone: Zone,
    timestamp: DateTime<Utc>,
) -> Result<CommandOutput, RadarDataErr> {
    let job = AccumulationJob {
        project: config.accumulations_project.clone(),
        timestamp,
        zone: Some(zone),
        log_dir: None,
    };

    run_logged(runner, &job.to_invocation())
}

/// Update the accumulations of every zone up to `timestamp`, output going to the log folder.
pub fn compute_for_all_zones(
    config: &Config,
    runner: &mut dyn CommandRunner,
    timestamp: DateTime<Utc>,
) -> Result<CommandOutput, RadarDataErr> {
    let job = AccumulationJob {
        project: config.accumulations_project.clone(),
        timestamp,
        zone: None,
        log_dir: Some(config.log_dir.clone()),
    };

    run_logged(runner, &job.to_invocation())
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::io::FakeCommandRunner;
    use chrono::TimeZone;
    use std::path::Path;

    fn timestamp() -> DateTime<Utc> {
        Utc.timestamp_opt(961_072_200, 0).unwrap()
    }

    #[test]
    fn test_compute_for_zone() {
        let config = Config::rooted_at(Path::new("/test"));
        let mut runner = FakeCommandRunner::default();

        compute_for_zone(&config, &mut runner, Zone::Reunion, timestamp()).unwrap();

        assert_eq!(
            runner.invocations[0].to_string(),
            "cd /test/generate-radaric-mf-values-accumulations && poetry run python \
             ./generate_radaric_mf_values_accumulations/main.py --timestamp 961072200 --zone REUNION"
        );
    }

    #[test]
    fn test_compute_for_all_zones() {
        let config = Config::rooted_at(Path::new("/test"));
        let mut runner = FakeCommandRunner::default();

        compute_for_all_zones(&config, &mut runner, timestamp()).unwrap();

        assert_eq!(
            runner.invocations[0].to_string(),
            "cd /test/generate-radaric-mf-values-accumulations && poetry run python \
             ./generate_radaric_mf_values_accumulations/main.py --timestamp 961072200 \
             >> /test/log/generate-radaric-mf-values-accumulations.log \
             2>> /test/log/generate-radaric-mf-values-accumulations.error.log"
        );
    }
}
