//! OFX document models
//!
//! The in-memory shape of the statement file we write: one bank account block
//! plus the ordered list of `STMTTRN` entries.

/// OFX `ACCTTYPE` values we emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Checking,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
        }
    }
}

/// OFX `TRNTYPE` values we emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Pos,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Pos => "POS",
        }
    }
}

/// `BANKACCTFROM` block
#[derive(Debug, Clone, PartialEq)]
pub struct BankAccount {
    pub bank_id: String,
    pub account_id: String,
    pub account_type: AccountType,
}

impl BankAccount {
    pub const BANK_ID: &'static str = "0";

    pub fn checking(account_id: &str) -> Self {
        Self {
            bank_id: Self::BANK_ID.to_string(),
            account_id: account_id.to_string(),
            account_type: AccountType::Checking,
        }
    }
}

/// One `STMTTRN` entry
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTransaction {
    pub trn_type: TransactionType,
    /// `YYYYMMDDhhmmss.sss[±HH]`
    pub posted: String,
    /// Major units (pounds), signed
    pub amount: f64,
    pub fit_id: String,
    pub name: String,
    /// Rendered as an XML comment, e.g. `Running Total: 130.13`
    pub running_total: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfxDocument {
    pub bank_account: BankAccount,
    pub transactions: Vec<StatementTransaction>,
}

impl OfxDocument {
    pub fn new(bank_account: BankAccount) -> Self {
        Self {
            bank_account,
            transactions: Vec::new(),
        }
    }

    pub fn push(&mut self, transaction: StatementTransaction) {
        self.transactions.push(transaction);
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
