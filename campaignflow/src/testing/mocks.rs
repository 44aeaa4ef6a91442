//! Deterministic fakes for every external collaborator.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    CampaignContext, CampaignResult, Candidate, ContactAddress, EnrichedLead, FilterSet,
    OutreachContent,
};
use crate::errors::ProviderError;
use crate::poller::{JobHandle, JobStatus};
use crate::providers::{
    CampaignStore, ContactEnricher, ContentFetcher, ContentWriter, JobSearchRequest, PageContent,
    PeopleSearchJobProvider, PeopleSearchProvider, PromptTask, ProviderPage, ReasoningService,
    StructuredPrompt,
};
use crate::source::pages_for;

type Responder = Arc<dyn Fn(&StructuredPrompt) -> Result<Value, ProviderError> + Send + Sync>;

/// Reasoning service answering from per-task scripts.
///
/// Tasks without a script fail with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedReasoning {
    responders: HashMap<PromptTask, Responder>,
    delay: Option<Duration>,
    calls: Arc<Mutex<HashMap<PromptTask, usize>>>,
    prompts: Arc<Mutex<Vec<StructuredPrompt>>>,
}

impl std::fmt::Debug for ScriptedReasoning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedReasoning")
            .field("tasks", &self.responders.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ScriptedReasoning {
    /// Creates a service with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `task` with a fixed value.
    #[must_use]
    pub fn with_response(self, task: PromptTask, answer: Value) -> Self {
        self.with_handler(task, move |_| Ok(answer.clone()))
    }

    /// Fails `task` with `error`.
    #[must_use]
    pub fn with_failure(self, task: PromptTask, error: ProviderError) -> Self {
        self.with_handler(task, move |_| Err(error.clone()))
    }

    /// Answers `task` by calling `handler` with the prompt.
    #[must_use]
    pub fn with_handler<F>(mut self, task: PromptTask, handler: F) -> Self
    where
        F: Fn(&StructuredPrompt) -> Result<Value, ProviderError> + Send + Sync + 'static,
    {
        self.responders.insert(task, Arc::new(handler));
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made for `task`.
    #[must_use]
    pub fn calls(&self, task: PromptTask) -> usize {
        self.calls.lock().get(&task).copied().unwrap_or(0)
    }

    /// Every prompt received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<StructuredPrompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<Value, ProviderError> {
        *self.calls.lock().entry(prompt.task).or_insert(0) += 1;
        self.prompts.lock().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.responders.get(&prompt.task) {
            Some(responder) => responder(prompt),
            None => Err(ProviderError::Transport(format!(
                "no scripted answer for {}",
                prompt.task.as_str()
            ))),
        }
    }
}

/// A reasoning service with plausible answers for every task.
///
/// Outreach is addressed to the lead named in the prompt.
#[must_use]
pub fn demo_reasoning() -> ScriptedReasoning {
    ScriptedReasoning::new()
        .with_response(
            PromptTask::WebsiteAnalysis,
            json!({
                "companyName": "Acme",
                "summary": "Acme builds workflow automation for operations teams.",
                "industries": ["Software"],
                "products": ["Acme Flow"],
                "targetMarket": "Mid-market operations teams",
                "valuePropositions": ["Fewer manual handoffs", "Faster month-end close"],
            }),
        )
        .with_response(
            PromptTask::PersonaGeneration,
            json!({"personas": [
                {
                    "id": "ops-leader",
                    "name": "Operations Leader",
                    "jobTitles": ["VP Operations", "Head of Operations"],
                    "seniority": "VP",
                    "industries": ["Software"],
                    "companySizes": ["51-200", "201-500"],
                    "locations": ["United States"],
                    "painPoints": ["Manual handoffs"],
                    "goals": ["Scale without headcount"],
                },
                {
                    "id": "finance-lead",
                    "name": "Finance Lead",
                    "jobTitles": ["Controller"],
                    "seniority": "Director",
                    "industries": ["Software"],
                    "companySizes": ["201-500"],
                    "painPoints": ["Slow close"],
                },
            ]}),
        )
        .with_response(
            PromptTask::PersonaRanking,
            json!({"rankings": [
                {"personaId": "ops-leader", "score": 86, "rationale": "Largest deals, clear pain"},
                {"personaId": "finance-lead", "score": 71, "rationale": "Smaller market"},
            ]}),
        )
        .with_response(
            PromptTask::FilterDerivation,
            json!({
                "titleKeywords": ["VP Operations", "Head of Operations"],
                "orgSizes": ["51-200", "201-500"],
                "industries": ["Software"],
                "locations": ["United States"],
            }),
        )
        .with_handler(PromptTask::OutreachContent, |prompt| {
            let name = prompt.input["lead"]["candidate"]["name"]
                .as_str()
                .unwrap_or("there");
            let first = name.split_whitespace().next().unwrap_or(name);
            Ok(json!({
                "subject": format!("Quick idea for {first}"),
                "body": format!("Hi {first}, teams like yours use Acme Flow to cut manual handoffs."),
            }))
        })
}

/// Content fetcher returning one fixed page.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    page: Result<PageContent, ProviderError>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    /// Returns `page` for every URL.
    #[must_use]
    pub fn new(page: PageContent) -> Self {
        Self {
            page: Ok(page),
            calls: Arc::default(),
        }
    }

    /// A small marketing page for Acme.
    #[must_use]
    pub fn acme() -> Self {
        Self::new(PageContent {
            url: String::new(),
            title: "Acme | Workflow automation".to_string(),
            description: "Automate operations handoffs.".to_string(),
            body_text: "Acme Flow connects your operations tools and removes manual handoffs."
                .to_string(),
        })
    }

    /// Fails every fetch with `error`.
    #[must_use]
    pub fn failing(error: ProviderError) -> Self {
        Self {
            page: Err(error),
            calls: Arc::default(),
        }
    }

    /// Number of fetches.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut page = self.page.clone()?;
        if page.url.is_empty() {
            page.url = url.to_string();
        }
        Ok(page)
    }
}

/// Paginated people search over a fixed candidate list.
#[derive(Debug, Default)]
pub struct FakePeopleSearch {
    candidates: Vec<Candidate>,
    total_pages: Option<u32>,
    failure: Option<u16>,
    delay: Option<Duration>,
    requests: Mutex<Vec<(u32, u32)>>,
    filters: Mutex<Vec<FilterSet>>,
}

impl FakePeopleSearch {
    /// Serves `candidates` in pages.
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    /// Fails every request with HTTP `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::default()
        }
    }

    /// Overrides the reported page total.
    #[must_use]
    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = Some(total_pages);
        self
    }

    /// Sleeps before every page.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(page, page_size)` of every request, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests.lock().clone()
    }

    /// Filters of every request, in order.
    #[must_use]
    pub fn filters(&self) -> Vec<FilterSet> {
        self.filters.lock().clone()
    }
}

#[async_trait]
impl PeopleSearchProvider for FakePeopleSearch {
    async fn search_page(
        &self,
        filters: &FilterSet,
        page: u32,
        page_size: u32,
    ) -> Result<ProviderPage, ProviderError> {
        self.requests.lock().push((page, page_size));
        self.filters.lock().push(filters.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.failure {
            return Err(ProviderError::Http {
                status,
                message: "search unavailable".to_string(),
            });
        }

        let size = page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * size;
        let window = self
            .candidates
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();
        let total_available = self.candidates.len() as u64;
        Ok(ProviderPage {
            candidates: window,
            total_available,
            total_pages: self
                .total_pages
                .unwrap_or_else(|| pages_for(total_available, page_size.max(1))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobBehavior {
    CompletesAfter(u32),
    NeverCompletes,
    Fails,
    RejectsSubmit,
}

/// Job-based people search with scripted job behavior.
#[derive(Debug)]
pub struct FakeJobProvider {
    behavior: JobBehavior,
    candidates: Vec<Candidate>,
    message: String,
    jobs: Mutex<HashMap<String, (JobSearchRequest, u32)>>,
    submitted: Mutex<Vec<JobSearchRequest>>,
    status_calls: AtomicU32,
}

impl FakeJobProvider {
    fn with_behavior(behavior: JobBehavior, candidates: Vec<Candidate>, message: &str) -> Self {
        Self {
            behavior,
            candidates,
            message: message.to_string(),
            jobs: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            status_calls: AtomicU32::new(0),
        }
    }

    /// Each job completes on its `status_calls`-th status query.
    #[must_use]
    pub fn completes_after(status_calls: u32, candidates: Vec<Candidate>) -> Self {
        Self::with_behavior(JobBehavior::CompletesAfter(status_calls.max(1)), candidates, "")
    }

    /// Jobs stay pending forever.
    #[must_use]
    pub fn never_completes() -> Self {
        Self::with_behavior(JobBehavior::NeverCompletes, Vec::new(), "")
    }

    /// Jobs report an explicit error with `message`.
    #[must_use]
    pub fn fails_with(message: &str) -> Self {
        Self::with_behavior(JobBehavior::Fails, Vec::new(), message)
    }

    /// Submission itself fails.
    #[must_use]
    pub fn rejects_submit() -> Self {
        Self::with_behavior(JobBehavior::RejectsSubmit, Vec::new(), "quota exceeded")
    }

    /// Every submitted request, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<JobSearchRequest> {
        self.submitted.lock().clone()
    }

    /// Total status queries across all jobs.
    #[must_use]
    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeopleSearchJobProvider for FakeJobProvider {
    async fn submit(&self, request: &JobSearchRequest) -> Result<JobHandle, ProviderError> {
        if self.behavior == JobBehavior::RejectsSubmit {
            return Err(ProviderError::Http {
                status: 429,
                message: self.message.clone(),
            });
        }
        let mut submitted = self.submitted.lock();
        submitted.push(request.clone());
        let handle = JobHandle::new(format!("job-{}", submitted.len()));
        self.jobs
            .lock()
            .insert(handle.as_str().to_string(), (request.clone(), 0));
        Ok(handle)
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<ProviderPage>, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock();
        let Some((request, calls)) = jobs.get_mut(handle.as_str()) else {
            return Err(ProviderError::Http {
                status: 404,
                message: format!("unknown job {handle}"),
            });
        };
        *calls += 1;

        match self.behavior {
            JobBehavior::CompletesAfter(needed) if *calls >= needed => {
                let window = self
                    .candidates
                    .iter()
                    .skip(request.offset as usize)
                    .take(request.limit as usize)
                    .cloned()
                    .collect();
                Ok(JobStatus::Complete(ProviderPage {
                    candidates: window,
                    total_available: self.candidates.len() as u64,
                    total_pages: 0,
                }))
            }
            JobBehavior::Fails => Ok(JobStatus::Error(self.message.clone())),
            _ => Ok(JobStatus::Pending { progress: None }),
        }
    }
}

/// Contact enricher verifying a chosen subset of candidates.
#[derive(Debug)]
pub struct FakeEnricher {
    verified: Option<HashSet<u32>>,
    calls: AtomicUsize,
}

impl FakeEnricher {
    /// Verifies candidates whose id is `cand-{n}` for `n` in `ids`.
    #[must_use]
    pub fn verifying_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            verified: Some(ids.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Verifies everyone.
    #[must_use]
    pub fn verifying_all() -> Self {
        Self {
            verified: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Verifies nobody.
    #[must_use]
    pub fn verifying_none() -> Self {
        Self::verifying_ids([])
    }

    /// Number of lookups.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn is_verified(&self, candidate: &Candidate) -> bool {
        match &self.verified {
            None => true,
            Some(ids) => candidate
                .id
                .as_deref()
                .and_then(|id| id.strip_prefix("cand-"))
                .and_then(|n| n.parse::<u32>().ok())
                .is_some_and(|n| ids.contains(&n)),
        }
    }
}

#[async_trait]
impl ContactEnricher for FakeEnricher {
    async fn enrich(&self, candidate: &Candidate) -> Result<Option<ContactAddress>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_verified(candidate) {
            return Ok(None);
        }
        let local = candidate.name.to_lowercase().replace(' ', ".");
        Ok(Some(ContactAddress::verified(format!("{local}@example.com"))))
    }
}

/// Content writer with per-lead failure modes.
#[derive(Debug, Default)]
pub struct FakeWriter {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    slow: HashMap<String, Duration>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeWriter {
    /// Writes content for everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors for the lead named `name`.
    #[must_use]
    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Panics for the lead named `name`.
    #[must_use]
    pub fn panicking_for(mut self, name: &str) -> Self {
        self.panicking.insert(name.to_string());
        self
    }

    /// Sleeps `delay` before writing for `name`.
    #[must_use]
    pub fn slow_for(mut self, name: &str, delay: Duration) -> Self {
        self.slow.insert(name.to_string(), delay);
        self
    }

    /// Sleeps `delay` before every write.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of writes started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent writes observed.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentWriter for FakeWriter {
    #[allow(clippy::panic)]
    async fn write(
        &self,
        lead: &EnrichedLead,
        context: &CampaignContext,
    ) -> Result<OutreachContent, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let name = lead.name().to_string();
        if let Some(delay) = self.slow.get(&name).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&name) {
            panic!("writer exploded for {name}");
        }
        if self.failing.contains(&name) {
            return Err(ProviderError::Http {
                status: 500,
                message: format!("writer failed for {name}"),
            });
        }
        Ok(OutreachContent {
            subject: format!("{} x {}", context.profile.company_name, name),
            body: format!("Hi {name}, a note for {}.", context.persona.name),
            follow_up: None,
        })
    }
}

/// Campaign store that rejects every save.
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    /// Creates the store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignStore for FailingStore {
    async fn save(&self, _result: &CampaignResult) -> Result<String, ProviderError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Transport("database unavailable".to_string()))
    }
}
