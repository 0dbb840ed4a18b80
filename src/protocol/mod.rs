use crate::core::{AccountNumber, Money};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

pub const INTERNAL_ERROR_RESPONSE: &str = "ER Internal server error";
pub const CAPACITY_RESPONSE: &str = "ER Bank node has reached its maximum number of connections";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command line")]
    EmptyLine,
    #[error("command not found: {0}")]
    UnknownVerb(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed account reference")]
pub struct ParseAccountRefError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    BankCode,
    AccountCreate,
    AccountDeposit,
    AccountWithdrawal,
    AccountBalance,
    AccountRemove,
    BankAmount,
    BankNumber,
    RobberyPlan,
}

impl Verb {
    pub const ALL: [Verb; 9] = [
        Verb::BankCode,
        Verb::AccountCreate,
        Verb::AccountDeposit,
        Verb::AccountWithdrawal,
        Verb::AccountBalance,
        Verb::AccountRemove,
        Verb::BankAmount,
        Verb::BankNumber,
        Verb::RobberyPlan,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Verb::BankCode => "BC",
            Verb::AccountCreate => "AC",
            Verb::AccountDeposit => "AD",
            Verb::AccountWithdrawal => "AW",
            Verb::AccountBalance => "AB",
            Verb::AccountRemove => "AR",
            Verb::BankAmount => "BA",
            Verb::BankNumber => "BN",
            Verb::RobberyPlan => "RP",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .iter()
            .find(|v| v.code() == s)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownVerb(s.to_string()))
    }
}

/// One received request line, split into an uppercased verb and its
/// arguments. The raw line is kept so it can be relayed to another node
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: Vec<String>,
    line: String,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut tokens = line.split_whitespace();
        let verb = tokens
            .next()
            .ok_or(ProtocolError::EmptyLine)?
            .to_uppercase();
        Ok(Command {
            verb,
            args: tokens.map(String::from).collect(),
            line: line.to_string(),
        })
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

/// `<account>/<ip>` as it appears in account commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountRef {
    pub number: AccountNumber,
    pub ip: Ipv4Addr,
}

impl FromStr for AccountRef {
    type Err = ParseAccountRefError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, ip) = s.split_once('/').ok_or(ParseAccountRefError)?;
        if ip.contains('/') {
            return Err(ParseAccountRefError);
        }
        Ok(AccountRef {
            number: number.parse().map_err(|_| ParseAccountRefError)?,
            ip: ip.parse().map_err(|_| ParseAccountRefError)?,
        })
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.ip)
    }
}

pub fn failure_response(verb: Verb, reason: &str) -> String {
    format!("ER {} Failed: {}", verb, reason)
}

/// Reads the number out of a `<VERB> <value>` answer. Anything else,
/// including `ER` replies and extra tokens, yields `None`.
pub fn parse_value_response(response: &str, verb: Verb) -> Option<Money> {
    let mut parts = response.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(code), Some(value), None) if code == verb.code() => value.parse().ok(),
        _ => None,
    }
}
