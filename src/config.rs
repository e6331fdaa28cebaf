use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted session lifetime, one year
pub const MAX_SESSION_HOURS: u64 = 24 * 365;

/// Student recommendation viewer
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Recommendations file; encoding and delimiter are detected
    #[arg(long, default_value = "student_recommendations.csv")]
    pub recommendations: PathBuf,

    /// Job postings file (UTF-8, comma separated, columns job_id and url)
    #[arg(long, default_value = "job_postings.csv")]
    pub job_postings: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Shared login password
    #[arg(long, env = "RECVIEW_PASSWORD", default_value = "1234", hide_env_values = true)]
    pub password: String,

    /// Session lifetime in hours (1 to 8760)
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_HOURS))]
    pub session_hours: u64,
}

impl Config {
    /// Session lifetime, clamped to [`MAX_SESSION_HOURS`] for configs built in code
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_hours.min(MAX_SESSION_HOURS) * 60 * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recommendations: PathBuf::from("student_recommendations.csv"),
            job_postings: PathBuf::from("job_postings.csv"),
            bind: "127.0.0.1:3000".to_string(),
            password: "1234".to_string(),
            session_hours: 24,
        }
    }
}
