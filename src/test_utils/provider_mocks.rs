//! Scripted payment processor and stub oracle provider.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        oracle::OracleProvider,
        payment_processor::{
            CheckoutRequest, CheckoutSession, PaymentInfo, PaymentProcessorPort, PreapprovalInfo,
        },
    },
    use_cases::checkout::CheckoutMode,
};

/// Processor double: fetches return whatever was scripted (unscripted ids are
/// `NotFound`, like a processor 404), creations are recorded and get fresh ids.
#[derive(Default)]
pub struct ScriptedPaymentProcessor {
    preapprovals: Mutex<HashMap<String, PreapprovalInfo>>,
    payments: Mutex<HashMap<String, PaymentInfo>>,
    created: Mutex<Vec<(CheckoutMode, CheckoutRequest)>>,
    fail_fetches: AtomicBool,
    fail_creates: AtomicBool,
    fetches: AtomicUsize,
}

impl ScriptedPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script (or replace) the state returned for a preapproval id.
    pub fn with_preapproval(&self, preapproval: PreapprovalInfo) {
        self.preapprovals
            .lock()
            .unwrap()
            .insert(preapproval.id.clone(), preapproval);
    }

    pub fn with_payment(&self, payment: PaymentInfo) {
        self.payments.lock().unwrap().insert(payment.id.clone(), payment);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn created_checkouts(&self) -> Vec<(CheckoutMode, CheckoutRequest)> {
        self.created.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn record_creation(&self, mode: CheckoutMode, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("simulated processor failure".into()));
        }
        let mut created = self.created.lock().unwrap();
        created.push((mode, request.clone()));

        let id = format!("{}-{}", prefix(mode), created.len());
        let redirect_url = match mode {
            CheckoutMode::OneTime => format!("https://checkout.test/pay?pref_id={id}"),
            CheckoutMode::Recurring => format!("https://checkout.test/subscribe?preapproval_id={id}"),
        };
        Ok(CheckoutSession { id, redirect_url })
    }

    fn begin_fetch(&self) -> AppResult<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("simulated fetch failure".into()));
        }
        Ok(())
    }
}

fn prefix(mode: CheckoutMode) -> &'static str {
    match mode {
        CheckoutMode::OneTime => "pref",
        CheckoutMode::Recurring => "preapproval",
    }
}

#[async_trait]
impl PaymentProcessorPort for ScriptedPaymentProcessor {
    async fn create_payment_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        self.record_creation(CheckoutMode::OneTime, request)
    }

    async fn create_subscription_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        self.record_creation(CheckoutMode::Recurring, request)
    }

    async fn get_preapproval(&self, id: &str) -> AppResult<PreapprovalInfo> {
        self.begin_fetch()?;
        self.preapprovals
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_payment(&self, id: &str) -> AppResult<PaymentInfo> {
        self.begin_fetch()?;
        self.payments
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}

/// Oracle provider that returns a canned answer and records questions.
pub struct StubOracleProvider {
    answer: Option<String>,
    questions: Mutex<Vec<String>>,
}

impl StubOracleProvider {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl OracleProvider for StubOracleProvider {
    async fn ask(&self, question: &str) -> AppResult<String> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answer
            .clone()
            .ok_or_else(|| AppError::Upstream("simulated provider failure".into()))
    }
}
