use crate::data::{MAX_SUB_STATS, main_stat_options, sub_stat_data};
use crate::model::{Echo, EchoCost, Stat};

const VALUE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EchoError {
    #[error("main stat {key}={value} is not available on cost {cost} echoes")]
    MainStatNotAllowed { cost: EchoCost, key: String, value: f64 },
    #[error("echo has {count} sub stats, at most five are allowed")]
    TooManySubStats { count: usize },
    #[error("unknown sub stat: {key}")]
    UnknownSubStat { key: String },
    #[error("sub stat {key} cannot roll {value}")]
    SubStatValueNotAllowed { key: String, value: f64 },
}

#[inline(always)]
fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE
}

pub fn validate_main_stat(cost: EchoCost, stat: &Stat) -> Result<(), EchoError> {
    let allowed = main_stat_options(cost)
        .iter()
        .any(|option| option.key == stat.key && same_value(option.value, stat.value));
    if !allowed {
        return Err(EchoError::MainStatNotAllowed {
            cost,
            key: stat.key.clone(),
            value: stat.value,
        });
    }
    Ok(())
}

pub fn validate_sub_stat(stat: &Stat) -> Result<(), EchoError> {
    let data = sub_stat_data(&stat.key).ok_or_else(|| EchoError::UnknownSubStat {
        key: stat.key.clone(),
    })?;
    if !data.values.iter().any(|&v| same_value(v, stat.value)) {
        return Err(EchoError::SubStatValueNotAllowed {
            key: stat.key.clone(),
            value: stat.value,
        });
    }
    Ok(())
}

/// Check an echo against the stat tables.
///
/// Echoes without a cost are unequipped slots and always pass.
pub fn validate_echo(echo: &Echo) -> Result<(), EchoError> {
    let Some(cost) = echo.cost else {
        return Ok(());
    };
    if let Some(main) = &echo.main_stat {
        validate_main_stat(cost, main)?;
    }
    if echo.sub_stats.len() > MAX_SUB_STATS {
        return Err(EchoError::TooManySubStats {
            count: echo.sub_stats.len(),
        });
    }
    for sub in &echo.sub_stats {
        validate_sub_stat(sub)?;
    }
    Ok(())
}
