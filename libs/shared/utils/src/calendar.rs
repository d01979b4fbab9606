//! Calendar helpers shared by every cell: weekday names per locale, date labels
//! and the lenient clock-time parsing used for stored schedule and appointment rows.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lowered = tag.trim().to_ascii_lowercase();
        match lowered.split(['-', '_']).next() {
            Some("es") => Some(Locale::Es),
            Some("en") => Some(Locale::En),
            _ => None,
        }
    }

    pub fn weekday_name(&self, day: Weekday) -> &'static str {
        match self {
            Locale::Es => match day {
                Weekday::Mon => "Lunes",
                Weekday::Tue => "Martes",
                Weekday::Wed => "Miércoles",
                Weekday::Thu => "Jueves",
                Weekday::Fri => "Viernes",
                Weekday::Sat => "Sábado",
                Weekday::Sun => "Domingo",
            },
            Locale::En => match day {
                Weekday::Mon => "Monday",
                Weekday::Tue => "Tuesday",
                Weekday::Wed => "Wednesday",
                Weekday::Thu => "Thursday",
                Weekday::Fri => "Friday",
                Weekday::Sat => "Saturday",
                Weekday::Sun => "Sunday",
            },
        }
    }

    pub fn unknown_person(&self) -> &'static str {
        match self {
            Locale::Es => "Desconocido",
            Locale::En => "Unknown",
        }
    }

    pub fn unknown_branch(&self) -> &'static str {
        match self {
            Locale::Es => "Desconocida",
            Locale::En => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calendar {
    locale: Locale,
}

impl Calendar {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn from_tag(tag: &str) -> Self {
        let locale = Locale::from_tag(tag).unwrap_or_else(|| {
            warn!("Unsupported calendar locale '{}', falling back to es", tag);
            Locale::Es
        });
        Self::new(locale)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn weekday_label(&self, date: NaiveDate) -> &'static str {
        self.locale.weekday_name(date.weekday())
    }

    /// `dd/mm/yyyy`
    pub fn short_date(&self, date: NaiveDate) -> String {
        date.format("%d/%m/%Y").to_string()
    }

    /// `<Weekday> dd/mm/yyyy`
    pub fn long_date(&self, date: NaiveDate) -> String {
        format!("{} {}", self.weekday_label(date), self.short_date(date))
    }

    pub fn unknown_person(&self) -> &'static str {
        self.locale.unknown_person()
    }

    pub fn unknown_branch(&self) -> &'static str {
        self.locale.unknown_branch()
    }
}

/// Accepts Spanish or English weekday names, with or without accents.
pub fn parse_weekday(label: &str) -> Option<Weekday> {
    let normalized: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect();

    match normalized.as_str() {
        "lunes" | "monday" | "mon" => Some(Weekday::Mon),
        "martes" | "tuesday" | "tue" => Some(Weekday::Tue),
        "miercoles" | "wednesday" | "wed" => Some(Weekday::Wed),
        "jueves" | "thursday" | "thu" => Some(Weekday::Thu),
        "viernes" | "friday" | "fri" => Some(Weekday::Fri),
        "sabado" | "saturday" | "sat" => Some(Weekday::Sat),
        "domingo" | "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parses `HH:MM` or `HH:MM:SS` (fractional seconds tolerated).
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter for weekday columns, written back with the storage (Spanish) names.
pub mod weekday_serde {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{parse_weekday, Locale};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(Locale::Es.weekday_name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_weekday(&raw).ok_or_else(|| de::Error::custom(format!("unknown weekday '{}'", raw)))
    }
}

/// Serde adapter for minute-resolution times (`HH:MM`), lenient on input.
pub mod clock_hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::parse_clock;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_clock(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}'", raw)))
    }
}

/// Serde adapter for schedule bounds, stored as `HH:MM:SS`.
pub mod clock_hhmmss {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::parse_clock;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_clock(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}'", raw)))
    }
}
