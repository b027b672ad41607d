use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::seat::LayoutVariant;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub app: AppConfig,
    pub pricing: PricingConfig,
    pub booking: BookingConfig,
    pub catalog: CatalogConfig,
    pub payment: PaymentConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            rust_log: "moviewave=debug,tower_http=debug".to_string(),
        }
    }
}

// Цены: билет, сервисный сбор, налог и минимальная сумма после скидки
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub ticket_price: i64,
    pub convenience_fee: i64,
    pub tax_rate: f64,
    pub discount_floor: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            ticket_price: 150,
            convenience_fee: 30,
            tax_rate: 0.18,
            discount_floor: 50,
        }
    }
}

// Настройки мастера бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub max_tickets: u8,
    pub seat_layout: LayoutVariant,
    pub showtimes: Vec<String>,
    pub session_idle_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_tickets: 10,
            seat_layout: LayoutVariant::Classic,
            showtimes: ["12:00 PM", "3:00 PM", "6:30 PM", "9:00 PM"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            session_idle_minutes: 30,
        }
    }
}

// Настройки каталога фильмов (TMDB)
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub cache_ttl_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            language: "en-US".to_string(),
            cache_ttl_seconds: 3600,
            timeout_seconds: 10,
        }
    }
}

// Настройки имитации платежного шлюза
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub processing_delay_ms: u64,
    pub success_rate: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 3000,
            success_rate: 0.9,
        }
    }
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_seconds: 60,
        }
    }
}

/// Читает переменную окружения, если она задана, иначе возвращает значение по умолчанию.
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_string(key: &'static str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let showtimes = match env::var("SHOWTIMES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.booking.showtimes.clone(),
        };

        let config = Config {
            app: AppConfig {
                host: env_string("HOST", defaults.app.host),
                port: env_or("PORT", defaults.app.port)?,
                environment: env_string("ENVIRONMENT", defaults.app.environment),
                rust_log: env_string("RUST_LOG", defaults.app.rust_log),
            },
            pricing: PricingConfig {
                ticket_price: env_or("TICKET_PRICE", defaults.pricing.ticket_price)?,
                convenience_fee: env_or("CONVENIENCE_FEE", defaults.pricing.convenience_fee)?,
                tax_rate: env_or("TAX_RATE", defaults.pricing.tax_rate)?,
                discount_floor: env_or("DISCOUNT_FLOOR", defaults.pricing.discount_floor)?,
            },
            booking: BookingConfig {
                max_tickets: env_or("MAX_TICKETS", defaults.booking.max_tickets)?,
                seat_layout: env_or("SEAT_LAYOUT", defaults.booking.seat_layout)?,
                showtimes,
                session_idle_minutes: env_or(
                    "SESSION_IDLE_MINUTES",
                    defaults.booking.session_idle_minutes,
                )?,
            },
            catalog: CatalogConfig {
                api_key: env_string("TMDB_API_KEY", defaults.catalog.api_key),
                base_url: env_string("TMDB_BASE_URL", defaults.catalog.base_url),
                image_base_url: env_string("TMDB_IMAGE_BASE_URL", defaults.catalog.image_base_url),
                language: env_string("TMDB_LANGUAGE", defaults.catalog.language),
                cache_ttl_seconds: env_or(
                    "CATALOG_CACHE_TTL_SECONDS",
                    defaults.catalog.cache_ttl_seconds,
                )?,
                timeout_seconds: env_or("CATALOG_TIMEOUT_SECONDS", defaults.catalog.timeout_seconds)?,
            },
            payment: PaymentConfig {
                processing_delay_ms: env_or(
                    "PAYMENT_PROCESSING_DELAY_MS",
                    defaults.payment.processing_delay_ms,
                )?,
                success_rate: env_or("PAYMENT_SUCCESS_RATE", defaults.payment.success_rate)?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env_or(
                    "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                    defaults.circuit_breaker.failure_threshold,
                )?,
                timeout_seconds: env_or(
                    "CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                    defaults.circuit_breaker.timeout_seconds,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Проверяет значения, которые нельзя выразить типом.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.payment.success_rate) {
            return Err(ConfigError::Invalid {
                key: "PAYMENT_SUCCESS_RATE",
                value: self.payment.success_rate.to_string(),
            });
        }
        if self.pricing.tax_rate < 0.0 {
            return Err(ConfigError::Invalid {
                key: "TAX_RATE",
                value: self.pricing.tax_rate.to_string(),
            });
        }
        if self.booking.max_tickets == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_TICKETS",
                value: "0".to_string(),
            });
        }
        if self.booking.showtimes.is_empty() {
            return Err(ConfigError::Invalid {
                key: "SHOWTIMES",
                value: String::new(),
            });
        }
        Ok(())
    }
}
