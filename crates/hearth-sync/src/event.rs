//! Keyspace-notification parsing.
//!
//! The remote store publishes on two channel families per database:
//! the standard family (`__keyspace@{d}__:<key>`, payload is a bare
//! event name) and the detailed family (`__keyspace_detailed@{d}__:<key>`,
//! payload is `<originator>:<event>[:<arg>]`). The key is the channel
//! with the prefix stripped; it may be empty.
//!
//! Parsing is pure and zero-copy: everything borrows from the incoming
//! channel and payload. Malformed payloads surface as typed errors so
//! the listener can log the reason and drop the notification; event
//! names outside the invalidation table decode to [`Event::Ignored`].

use hearth_store::Exclude;
use thiserror::Error;

/// Ways a notification payload can be unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Payload bytes are not valid UTF-8.
    #[error("payload is not valid utf-8")]
    NotUtf8,

    /// A detailed payload with no `:` has no originator field.
    #[error("detailed payload has no originator delimiter")]
    MissingOriginator,
}

/// The two channel prefixes for one database index.
#[derive(Debug, Clone)]
pub struct Channels {
    standard_prefix: String,
    detailed_prefix: String,
}

/// A notification split into its wire-level parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput<'a> {
    /// Standard-family notification: the store's own keyspace event.
    Standard { key: &'a str, event: &'a str },
    /// Detailed-family notification published by another cache client.
    /// `arg` is empty when the payload lacks a second `:`; it keeps any
    /// further `:` characters verbatim.
    Detailed {
        key: &'a str,
        originator: &'a str,
        event: &'a str,
        arg: &'a str,
    },
    /// The channel matches neither family.
    Unknown,
}

impl Channels {
    /// Builds the channel prefixes for the given database index.
    pub fn new(db_index: u32) -> Self {
        Self {
            standard_prefix: format!("__keyspace@{db_index}__:"),
            detailed_prefix: format!("__keyspace_detailed@{db_index}__:"),
        }
    }

    /// Subscription pattern covering every key on the standard family.
    pub fn standard_pattern(&self) -> String {
        format!("{}*", self.standard_prefix)
    }

    /// Subscription pattern covering every key on the detailed family.
    pub fn detailed_pattern(&self) -> String {
        format!("{}*", self.detailed_prefix)
    }

    /// Splits a raw `(channel, payload)` pair into its parts.
    ///
    /// Prefixes are matched literally. Detailed payloads split on the
    /// first two `:` only.
    pub fn parse<'a>(
        &self,
        channel: &'a str,
        payload: &'a [u8],
    ) -> Result<ParsedInput<'a>, ParseError> {
        if let Some(key) = channel.strip_prefix(&self.standard_prefix) {
            let event = std::str::from_utf8(payload).map_err(|_| ParseError::NotUtf8)?;
            return Ok(ParsedInput::Standard { key, event });
        }
        if let Some(key) = channel.strip_prefix(&self.detailed_prefix) {
            let payload = std::str::from_utf8(payload).map_err(|_| ParseError::NotUtf8)?;
            let (originator, tail) = payload
                .split_once(':')
                .ok_or(ParseError::MissingOriginator)?;
            let (event, arg) = tail.split_once(':').unwrap_or((tail, ""));
            return Ok(ParsedInput::Detailed {
                key,
                originator,
                event,
                arg,
            });
        }
        Ok(ParsedInput::Unknown)
    }
}

/// A keyspace event resolved against the invalidation table.
///
/// Everything outside the table, and every tabulated event whose
/// argument fails to parse, is [`Event::Ignored`]: bad input from the
/// network degrades to a dropped notification, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    /// The store expired the key.
    Expired { key: &'a str },
    /// The key was deleted.
    Deleted { key: &'a str },
    /// The key's TTL changed; local TTL metadata is stale.
    Expire { key: &'a str },
    /// The key was renamed.
    Renamed { from: &'a str, to: &'a str },
    /// The key was overwritten with SET.
    StringSet { key: &'a str },
    /// The string value was mutated in place (append, incr, setrange, ...).
    StringMutated { key: &'a str },
    /// A single hash field changed or was removed.
    HashFieldChanged { key: &'a str, field: &'a str },
    /// A set member was removed, named by its identity token.
    SetMemberRemoved { key: &'a str, token: &'a str },
    /// A sorted-set member was added, removed, or re-scored.
    SortedSetMemberChanged { key: &'a str, token: i64 },
    /// A score range was removed from a sorted set.
    SortedSetRangeByScoreRemoved {
        key: &'a str,
        start: f64,
        stop: f64,
        exclude: Exclude,
    },
    /// A rank or lex range was removed; the whole shadow is suspect.
    SortedSetRangeInvalidated { key: &'a str },
    /// Not in the invalidation table, or the argument failed to parse.
    Ignored,
}

impl<'a> Event<'a> {
    /// Resolves a standard-family event. Only `expired` is tabulated on
    /// this family.
    pub fn decode_standard(key: &'a str, event: &str) -> Event<'a> {
        match event {
            "expired" => Event::Expired { key },
            _ => Event::Ignored,
        }
    }

    /// Resolves a detailed-family event against the invalidation table.
    pub fn decode_detailed(key: &'a str, event: &str, arg: &'a str) -> Event<'a> {
        match event {
            "del" => Event::Deleted { key },
            "expire" => Event::Expire { key },
            "rename_key" if !arg.is_empty() => Event::Renamed { from: key, to: arg },
            "set" => Event::StringSet { key },
            "setbit" | "setrange" | "incrby" | "incrbyfloat" | "decrby" | "decrbyfloat"
            | "append" => Event::StringMutated { key },
            "hset" | "hdel" | "hincr" | "hincrbyfloat" | "hdecr" | "hdecrbyfloat" => {
                Event::HashFieldChanged { key, field: arg }
            }
            "srem" => Event::SetMemberRemoved { key, token: arg },
            "zadd" | "zrem" | "zincr" | "zdecr" => match arg.parse::<i64>() {
                Ok(token) => Event::SortedSetMemberChanged { key, token },
                Err(_) => Event::Ignored,
            },
            "zremrangebyscore" => decode_score_range(key, arg),
            "zremrangebyrank" | "zremrangebylex" => Event::SortedSetRangeInvalidated { key },
            _ => Event::Ignored,
        }
    }
}

/// Decodes a `zremrangebyscore` argument: exactly three `-`-separated
/// sub-fields (start score, stop score, exclude code). Any deviation
/// drops the event. A negative score adds a fourth field and is
/// rejected here; the notifier encodes ranges with non-negative bounds.
fn decode_score_range<'a>(key: &'a str, arg: &str) -> Event<'a> {
    let mut fields = arg.split('-');
    let (Some(start), Some(stop), Some(code), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Event::Ignored;
    };
    let (Ok(start), Ok(stop), Ok(code)) =
        (start.parse::<f64>(), stop.parse::<f64>(), code.parse::<u8>())
    else {
        return Event::Ignored;
    };
    match Exclude::from_code(code) {
        Some(exclude) => Event::SortedSetRangeByScoreRemoved {
            key,
            start,
            stop,
            exclude,
        },
        None => Event::Ignored,
    }
}
