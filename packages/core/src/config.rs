//! Централизованная конфигурация ядра переговоров
//!
//! Все адреса, таймауты и лимиты определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::str::FromStr;
use std::sync::OnceLock;

/// Глобальная конфигурация приложения (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // СЕТЕВЫЕ ПАРАМЕТРЫ
    // ============================================

    /// Адрес WebSocket канала (без токена)
    pub ws_url: String,

    /// Базовый адрес REST API
    pub api_base_url: String,

    /// Таймаут HTTP запроса (в секундах)
    pub request_timeout_secs: u64,

    /// Шаг линейного backoff при переподключении (в миллисекундах)
    pub reconnect_base_delay_ms: u64,

    /// Потолок задержки переподключения (в миллисекундах)
    pub reconnect_max_delay_ms: u64,

    // ============================================
    // ИСТОРИЯ И СПИСОК ДИАЛОГОВ
    // ============================================

    /// Сколько сообщений запрашивать при открытии диалога
    pub history_page_size: usize,

    /// Время жизни кеша списка диалогов (в секундах)
    pub directory_cache_ttl_secs: u64,

    /// Файл, в котором хранится множество архивных диалогов
    pub archive_file: String,

    // ============================================
    // ВАЛИДАЦИЯ
    // ============================================

    /// Максимальная длина текстового сообщения (в символах)
    pub max_message_length: usize,
}

impl Config {
    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            // Сеть
            ws_url: "ws://localhost:8080/ws/chat".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 15,
            reconnect_base_delay_ms: 500,
            reconnect_max_delay_ms: 8000,

            // История
            history_page_size: 50,
            directory_cache_ttl_secs: 30,
            archive_file: "chat_archived_conversations.json".to_string(),

            // Валидация
            max_message_length: 2000,
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("NEGOTIATION_WS_URL") {
            config.ws_url = val;
        }

        if let Ok(val) = std::env::var("NEGOTIATION_API_BASE") {
            config.api_base_url = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_FILE") {
            config.archive_file = val;
        }

        override_from_env("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs);
        override_from_env("RECONNECT_BASE_DELAY_MS", &mut config.reconnect_base_delay_ms);
        override_from_env("RECONNECT_MAX_DELAY_MS", &mut config.reconnect_max_delay_ms);
        override_from_env("HISTORY_PAGE_SIZE", &mut config.history_page_size);
        override_from_env("DIRECTORY_CACHE_TTL_SECS", &mut config.directory_cache_ttl_secs);
        override_from_env("MAX_MESSAGE_LENGTH", &mut config.max_message_length);

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}

/// Нечисловые или пустые значения игнорируются
fn override_from_env<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(val) = std::env::var(name) {
        if let Ok(parsed) = val.trim().parse() {
            *target = parsed;
        }
    }
}
