// Логирование

/// Фильтр по умолчанию, если RUST_LOG не задан
pub const DEFAULT_FILTER: &str = "negotiation_core=info";

/// Установить глобальный subscriber с фильтром из RUST_LOG.
///
/// Повторная установка не считается ошибкой: первый subscriber остаётся.
#[cfg(feature = "native")]
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
