//! Bounds and cross-field checks: `RawJobConfig` -> `JobConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{DEFAULT_RESOURCE_PATTERNS, ExecutionMode, ResourcePatterns};

use super::ConfigError;
use super::job::{
    Connection, Credentials, DateRange, ExecutionSettings, JobConfig, MIN_CYCLE_MILLIS,
    RESERVED_ENV, ReplaySettings, TimestampColumn,
};
use super::schema::{
    AuthMethod, RawConnection, RawDates, RawExecution, RawJobConfig, RawReplay, RawTimestampColumn,
};

pub fn validate(raw: RawJobConfig) -> Result<JobConfig, ConfigError> {
    validate_name(&raw.name)?;
    let connection = validate_connection(raw.connection)?;
    let execution = validate_execution(raw.execution)?;
    let replay = match (execution.mode, raw.replay) {
        (ExecutionMode::Replay, Some(replay)) => Some(validate_replay(replay)?),
        (ExecutionMode::Replay, None) => {
            return Err(ConfigError::Replay(
                "`replay` section is required when execution.mode is replay".into(),
            ));
        }
        (ExecutionMode::Batch, Some(_)) => {
            return Err(ConfigError::Replay(
                "`replay` section is not allowed when execution.mode is batch".into(),
            ));
        }
        (ExecutionMode::Batch, None) => None,
    };
    let dates = validate_dates(raw.dates)?;

    for key in raw.env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(ConfigError::InvalidValue {
                field: "env",
                value: key.clone(),
                expected: "environment variable name",
            });
        }
        if RESERVED_ENV.contains(&key.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "env",
                value: key.clone(),
                expected: "name not reserved by the orchestrator",
            });
        }
    }

    Ok(JobConfig {
        name: raw.name,
        connection,
        execution,
        replay,
        dates,
        env: raw.env,
    })
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Missing { field: "name" });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::InvalidValue {
            field: "name",
            value: name.to_string(),
            expected: "name made of [A-Za-z0-9_-]",
        });
    }
    Ok(())
}

fn validate_connection(raw: RawConnection) -> Result<Connection, ConfigError> {
    if raw.url.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "connection.url",
        });
    }

    let credentials = match raw.auth_method {
        AuthMethod::None => {
            if raw.password.is_some() || raw.private_key_path.is_some() {
                return Err(ConfigError::Auth(
                    "auth_method is none but credentials were supplied".into(),
                ));
            }
            Credentials::None
        }
        AuthMethod::Password => {
            if raw.private_key_path.is_some() {
                return Err(ConfigError::Auth(
                    "private_key_path is only valid with auth_method private_key".into(),
                ));
            }
            let username = require_username(raw.username)?;
            let password = match raw.password {
                Some(p) if !p.is_empty() => p,
                _ => {
                    return Err(ConfigError::Auth(
                        "auth_method password requires a non-empty password".into(),
                    ));
                }
            };
            Credentials::Password { username, password }
        }
        AuthMethod::PrivateKey => {
            if raw.password.is_some() {
                return Err(ConfigError::Auth(
                    "password is only valid with auth_method password".into(),
                ));
            }
            let username = require_username(raw.username)?;
            let Some(path) = raw.private_key_path else {
                return Err(ConfigError::Auth(
                    "auth_method private_key requires private_key_path".into(),
                ));
            };
            let key_path = PathBuf::from(path);
            if !is_regular_file(&key_path) {
                return Err(ConfigError::Auth(format!(
                    "private key {} does not exist or is not a regular file",
                    key_path.display()
                )));
            }
            Credentials::PrivateKey { username, key_path }
        }
    };

    Ok(Connection {
        url: raw.url,
        credentials,
    })
}

fn require_username(username: Option<String>) -> Result<String, ConfigError> {
    match username {
        Some(u) if !u.trim().is_empty() => Ok(u),
        _ => Err(ConfigError::Auth("username is required".into())),
    }
}

fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn validate_execution(raw: RawExecution) -> Result<ExecutionSettings, ConfigError> {
    if raw.script_path.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "execution.script_path",
        });
    }
    if raw.launcher.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "execution.launcher",
        });
    }

    check_u32(
        "execution.num_partitions",
        raw.num_partitions,
        1,
        10_000,
        "[1, 10000]",
    )?;
    check_u32(
        "execution.max_concurrent_sessions",
        raw.max_concurrent_sessions,
        1,
        1000,
        "(0, 1000]",
    )?;
    check_open_closed("execution.heap_size_gb", raw.heap_size_gb, 512.0, "(0, 512]")?;
    check_u32("execution.max_retries", raw.max_retries, 0, 100, "[0, 100]")?;
    if let Some(max_failures) = raw.max_failures {
        check_u32(
            "execution.max_failures",
            max_failures,
            1,
            u32::MAX,
            ">= 1",
        )?;
    }
    let retry_delay = seconds(
        "execution.retry_delay_secs",
        raw.retry_delay_secs,
        3600.0,
        "(0, 3600]",
    )?;
    let resource_retry_delay = seconds(
        "execution.resource_retry_delay_secs",
        raw.resource_retry_delay_secs,
        3600.0,
        "(0, 3600]",
    )?;
    let status_timeout = seconds(
        "execution.status_timeout_secs",
        raw.status_timeout_secs,
        300.0,
        "(0, 300]",
    )?;
    let poll_fallback = seconds(
        "execution.poll_fallback_secs",
        raw.poll_fallback_secs,
        300.0,
        "(0, 300]",
    )?;
    check_u32(
        "execution.startup_idle_iterations",
        raw.startup_idle_iterations,
        1,
        u32::MAX,
        ">= 1",
    )?;
    check_u32(
        "execution.idle_iterations",
        raw.idle_iterations,
        1,
        raw.startup_idle_iterations,
        "[1, startup_idle_iterations]",
    )?;

    let resource_patterns = match (raw.resource_retry, raw.resource_patterns) {
        (false, Some(_)) => {
            return Err(ConfigError::InvalidValue {
                field: "execution.resource_patterns",
                value: "<list>".into(),
                expected: "setting only when resource_retry is true",
            });
        }
        (false, None) => ResourcePatterns::disabled(),
        (true, Some(patterns)) => {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "execution.resource_patterns",
                    value: "\"\"".into(),
                    expected: "non-empty pattern",
                });
            }
            ResourcePatterns::new(patterns)
        }
        (true, None) => ResourcePatterns::new(DEFAULT_RESOURCE_PATTERNS),
    };

    Ok(ExecutionSettings {
        script_path: PathBuf::from(raw.script_path),
        mode: raw.mode,
        launcher: raw.launcher,
        num_partitions: raw.num_partitions,
        max_concurrent_sessions: raw.max_concurrent_sessions as usize,
        heap_size_gb: raw.heap_size_gb,
        max_retries: raw.max_retries,
        max_failures: raw.max_failures.map(|n| n as usize),
        retry_delay,
        resource_patterns,
        resource_retry_delay,
        status_timeout,
        poll_fallback,
        startup_idle_iterations: raw.startup_idle_iterations,
        idle_iterations: raw.idle_iterations,
        delete_successful: raw.delete_successful,
        delete_failed: raw.delete_failed,
        stop_on_shutdown: raw.stop_on_shutdown,
    })
}

fn validate_replay(raw: RawReplay) -> Result<ReplaySettings, ConfigError> {
    let replay_time = NaiveTime::parse_from_str(&raw.replay_time, "%H:%M:%S").map_err(|_| {
        ConfigError::InvalidValue {
            field: "replay.replay_time",
            value: raw.replay_time.clone(),
            expected: "time of day (HH:MM:SS)",
        }
    })?;
    if !raw.replay_speed.is_finite() || raw.replay_speed < 1.0 || raw.replay_speed > 100.0 {
        return Err(ConfigError::OutOfRange {
            field: "replay.replay_speed",
            value: raw.replay_speed.to_string(),
            bounds: "[1.0, 100.0]",
        });
    }
    if raw.buffer_rows == Some(0) {
        return Err(ConfigError::OutOfRange {
            field: "replay.buffer_rows",
            value: "0".into(),
            bounds: ">= 1",
        });
    }
    check_open_closed(
        "replay.init_timeout_minutes",
        raw.init_timeout_minutes,
        1440.0,
        "(0, 1440]",
    )?;
    if raw.jvm_profile.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "replay.jvm_profile",
        });
    }
    if raw.server_name.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "replay.server_name",
        });
    }
    let timestamp_columns = raw
        .replay_timestamp_columns
        .into_iter()
        .map(validate_timestamp_column)
        .collect::<Result<Vec<_>, _>>()?;

    let settings = ReplaySettings {
        replay_time,
        replay_speed: raw.replay_speed,
        sorted_replay: raw.sorted_replay,
        buffer_rows: raw.buffer_rows,
        timestamp_columns,
        init_timeout: Duration::from_secs_f64(raw.init_timeout_minutes * 60.0),
        script_language: raw.script_language,
        jvm_profile: raw.jvm_profile,
        server_name: raw.server_name,
    };
    if let Some(millis) = settings.target_cycle_millis()
        && millis < MIN_CYCLE_MILLIS
    {
        return Err(ConfigError::OutOfRange {
            field: "replay.replay_speed",
            value: settings.replay_speed.to_string(),
            bounds: "speed whose update cycle is at least 10ms",
        });
    }
    Ok(settings)
}

fn validate_timestamp_column(raw: RawTimestampColumn) -> Result<TimestampColumn, ConfigError> {
    for (field, value) in [
        ("replay.replay_timestamp_columns.namespace", &raw.namespace),
        ("replay.replay_timestamp_columns.table", &raw.table),
        ("replay.replay_timestamp_columns.column", &raw.column),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Missing { field });
        }
    }
    Ok(TimestampColumn {
        namespace: raw.namespace,
        table: raw.table,
        column: raw.column,
    })
}

fn validate_dates(raw: RawDates) -> Result<DateRange, ConfigError> {
    let start = parse_date("dates.start", &raw.start)?;
    let end = parse_date("dates.end", &raw.end)?;
    if end < start {
        return Err(ConfigError::DateRange {
            start: raw.start,
            end: raw.end,
        });
    }
    Ok(DateRange {
        start,
        end,
        weekdays_only: raw.weekdays_only,
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn check_u32(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
    bounds: &'static str,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            bounds,
        });
    }
    Ok(())
}

fn check_open_closed(
    field: &'static str,
    value: f64,
    max: f64,
    bounds: &'static str,
) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            bounds,
        });
    }
    Ok(())
}

fn seconds(
    field: &'static str,
    value: f64,
    max: f64,
    bounds: &'static str,
) -> Result<Duration, ConfigError> {
    check_open_closed(field, value, max, bounds)?;
    Ok(Duration::from_secs_f64(value))
}
