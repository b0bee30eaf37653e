use super::{Candidate, CandidateList};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

pub const OTHER_LABEL: &str = "Other";

/// (label, pattern, exclude)
type Seed = (&'static str, &'static str, Option<&'static str>);

const DEVICE_SEEDS: &[Seed] = &[
    ("Desktop", r"(?i)windows nt|macintosh|x11|cros", Some(r"(?i)mobile|tablet|bot|crawler|spider")),
    ("Mobile", r"(?i)mobile|iphone|ipod|android|blackberry|opera mini", Some(r"(?i)ipad|tablet|bot|crawler|spider")),
    ("Tablet", r"(?i)ipad|tablet|kindle|silk|playbook", Some(r"(?i)bot|crawler|spider")),
    ("Bot", r"(?i)bot|crawler|spider|slurp|curl/|wget/|python-requests|go-http-client", None),
];

const OS_SEEDS: &[Seed] = &[
    ("Windows", r"Windows", None),
    ("Android", r"Android", None),
    ("iOS", r"iPhone|iPad|iPod", None),
    ("macOS", r"Macintosh|Mac OS X", Some(r"iPhone|iPad|iPod")),
    ("Linux", r"(?i)x11|ubuntu|fedora|debian", Some(r"CrOS|Android")),
    ("ChromeOS", r"CrOS", None),
];

const CLIENT_SEEDS: &[Seed] = &[
    ("Chrome", r"Chrome/|CriOS/", Some(r"Edg|OPR/|Opera|SamsungBrowser")),
    ("Safari", r"Safari/", Some(r"Chrome|CriOS|Chromium|Edg|OPR/|FxiOS|Android")),
    ("Firefox", r"Firefox/|FxiOS/", None),
    ("Edge", r"Edg(?:e|A|iOS)?/", None),
    ("Opera", r"OPR/|Opera", None),
    ("Samsung Internet", r"SamsungBrowser/", None),
    ("Internet Explorer", r"MSIE |Trident/", None),
    ("curl", r"^curl/", None),
    ("Wget", r"^Wget/", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Device,
    Os,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentBreakdown {
    pub device: String,
    pub os: String,
    pub client: String,
}

/// Three independent, pre-seeded candidate lists, each serialized behind its
/// own lock since promotion is not atomic.
#[derive(Debug)]
pub struct UserAgentClassifier {
    devices: Mutex<CandidateList>,
    systems: Mutex<CandidateList>,
    clients: Mutex<CandidateList>,
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentClassifier {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(seed(DEVICE_SEEDS)),
            systems: Mutex::new(seed(OS_SEEDS)),
            clients: Mutex::new(seed(CLIENT_SEEDS)),
        }
    }

    pub fn classify_in(&self, domain: Domain, user_agent: &str) -> String {
        self.domain(domain)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .classify(user_agent)
    }

    pub fn device(&self, user_agent: &str) -> String {
        self.classify_in(Domain::Device, user_agent)
    }

    pub fn os(&self, user_agent: &str) -> String {
        self.classify_in(Domain::Os, user_agent)
    }

    pub fn client(&self, user_agent: &str) -> String {
        self.classify_in(Domain::Client, user_agent)
    }

    pub fn classify(&self, user_agent: &str) -> UserAgentBreakdown {
        UserAgentBreakdown {
            device: self.device(user_agent),
            os: self.os(user_agent),
            client: self.client(user_agent),
        }
    }

    /// Current `(label, match_count)` order of one domain.
    pub fn snapshot(&self, domain: Domain) -> Vec<(String, u64)> {
        self.domain(domain)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    fn domain(&self, domain: Domain) -> &Mutex<CandidateList> {
        match domain {
            Domain::Device => &self.devices,
            Domain::Os => &self.systems,
            Domain::Client => &self.clients,
        }
    }
}

fn seed(seeds: &[Seed]) -> CandidateList {
    let candidates = seeds
        .iter()
        .map(|(label, pattern, exclude)| {
            let candidate = match exclude {
                Some(exclude) => Candidate::excluding(label, pattern, exclude),
                None => Candidate::new(label, pattern),
            };
            candidate.expect("seed patterns are valid")
        })
        .collect();
    CandidateList::new(candidates, OTHER_LABEL)
}
