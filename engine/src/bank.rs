//! Domain-keyed question bank with reference answers

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Domain used when the requested one is unknown or empty
pub const FALLBACK_DOMAIN: &str = "default";

/// Reference used when a domain has no reference for an index
pub const GENERIC_REFERENCE: &str = "An ideal answer would explain the concept clearly, provide specific examples from your experience, and discuss potential trade-offs or alternative approaches. It would demonstrate both theoretical knowledge and practical application.";

const GENERAL_QUESTIONS: [&str; 10] = [
    "Tell me about yourself and your background.",
    "What are your greatest strengths and weaknesses?",
    "Why are you interested in this role?",
    "Describe a challenging situation you faced and how you resolved it.",
    "Where do you see yourself in five years?",
    "How do you handle stress and pressure?",
    "Describe a time when you had to work with a difficult team member.",
    "What motivates you in your work?",
    "How do you prioritize your tasks when you have multiple deadlines?",
    "What questions do you have for me?",
];

const GENERAL_REFERENCES: [&str; 5] = [
    "I'm a passionate professional with experience in [relevant field]. My background includes [education] and [key experiences]. I've developed strong skills in [key skills] through my work at [previous companies/projects]. I'm particularly interested in [specific aspects of the field] and have a track record of [achievements].",
    "My greatest strength is my ability to [specific strength with example]. I'm also skilled at [another strength] which has helped me [specific achievement]. As for weaknesses, I sometimes [honest weakness] but I've been working to improve by [specific action taken].",
    "I'm interested in this role because it aligns with my skills in [relevant skills] and my passion for [relevant aspect of the industry]. This position would allow me to contribute my expertise in [specific area] while growing in [learning opportunity].",
    "In my previous role at [company/project], I faced a challenging situation where [describe problem]. I approached it by first [first step], then [second step], collaborating with [stakeholders]. Ultimately, we [positive outcome] and I learned [lesson learned].",
    "In five years, I see myself having grown into a [target role] where I can leverage my expertise in [skill area] to [impact you want to make], having taken on increasing responsibility in [specific area of interest].",
];

const FRONTEND_QUESTIONS: [&str; 10] = [
    "Explain the difference between localStorage and sessionStorage.",
    "What is the virtual DOM in React and how does it work?",
    "Explain CSS specificity and how it's calculated.",
    "What are closures in JavaScript and how would you use them?",
    "Describe the concept of responsive design and how you implement it.",
    "What is the difference between == and === in JavaScript?",
    "Explain how event delegation works in JavaScript.",
    "What are React hooks and why were they introduced?",
    "Describe the CSS box model and its components.",
    "What is the purpose of the 'key' prop in React lists?",
];

const FRONTEND_REFERENCES: [&str; 5] = [
    "localStorage and sessionStorage are both web storage APIs. localStorage persists data until explicitly cleared, even after the browser is closed. sessionStorage keeps data only for the page session and clears it when the tab closes. Both hold roughly 5-10MB and are synchronous, so heavy use can block the main thread.",
    "The virtual DOM is a lightweight in-memory copy of the real DOM. When state changes, React builds a new virtual tree, diffs it against the previous one, and applies only the minimal set of changes to the real DOM during reconciliation.",
    "Specificity decides which rule applies when several target the same element. It is computed from inline styles, IDs, classes/attributes/pseudo-classes, and elements/pseudo-elements, in that order of weight. The highest specificity wins, ties go to the last rule, and !important overrides normal calculation.",
    "A closure is a function that keeps access to its lexical scope when executed outside it. Closures enable data encapsulation and private state, and I use them for factory functions, the module pattern, and event handlers that need variables from their enclosing scope.",
    "Responsive design makes pages render well across screen sizes. I use fluid grids with relative units, flexible media, media queries, a mobile-first approach, and testing across real devices.",
];

const BACKEND_QUESTIONS: [&str; 10] = [
    "Explain RESTful API design principles.",
    "What are the differences between SQL and NoSQL databases?",
    "Describe how you would handle authentication in a web application.",
    "Explain the concept of middleware in Express.js or similar frameworks.",
    "How would you optimize database queries for performance?",
    "What is the difference between authentication and authorization?",
    "Explain the concept of database normalization.",
    "What are microservices and what are their advantages?",
    "How would you implement error handling in a REST API?",
    "Explain the concept of database indexing and its benefits.",
];

const DATA_SCIENCE_QUESTIONS: [&str; 10] = [
    "Explain the difference between supervised and unsupervised learning.",
    "What is overfitting and how can you prevent it?",
    "Describe the process of feature selection in machine learning.",
    "Explain the concept of cross-validation.",
    "How would you handle imbalanced datasets?",
    "What is the difference between correlation and causation?",
    "Explain the bias-variance tradeoff in machine learning.",
    "What is regularization and why is it important?",
    "Describe the steps in a typical data science project.",
    "What is the curse of dimensionality and how does it affect machine learning?",
];

/// One prompt with its optional reference answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub reference: Option<String>,
}

/// Questions and reference answers of one domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBank {
    pub questions: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl DomainBank {
    fn from_static(questions: &[&str], references: &[&str]) -> Self {
        Self {
            questions: questions.iter().map(|q| q.to_string()).collect(),
            references: references.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BankFile {
    domains: HashMap<String, DomainBank>,
}

/// All question domains known to the session engine
#[derive(Debug, Clone)]
pub struct QuestionBank {
    domains: HashMap<String, DomainBank>,
}

impl QuestionBank {
    /// The bank shipped with the application
    pub fn builtin() -> Self {
        let mut domains = HashMap::new();
        domains.insert(
            FALLBACK_DOMAIN.to_string(),
            DomainBank::from_static(&GENERAL_QUESTIONS, &GENERAL_REFERENCES),
        );
        domains.insert(
            "frontend".to_string(),
            DomainBank::from_static(&FRONTEND_QUESTIONS, &FRONTEND_REFERENCES),
        );
        domains.insert(
            "backend".to_string(),
            DomainBank::from_static(&BACKEND_QUESTIONS, &[]),
        );
        domains.insert(
            "data-science".to_string(),
            DomainBank::from_static(&DATA_SCIENCE_QUESTIONS, &[]),
        );
        Self { domains }
    }

    /// Built-in bank with domains from a JSON file layered on top
    pub fn with_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank {}", path.display()))?;
        let mut bank = Self::builtin();
        bank.merge_json(&raw)
            .with_context(|| format!("failed to parse question bank {}", path.display()))?;
        Ok(bank)
    }

    /// Replace or add domains from a JSON document
    pub fn merge_json(&mut self, raw: &str) -> Result<()> {
        let file: BankFile = serde_json::from_str(raw)?;
        for (key, domain) in file.domains {
            if domain.questions.is_empty() {
                warn!(domain = %key, "ignoring domain without questions");
                continue;
            }
            debug!(domain = %key, questions = domain.questions.len(), "domain loaded");
            self.domains.insert(key, domain);
        }
        Ok(())
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Up to `limit` questions for `domain`, never empty
    pub fn questions(&self, domain: &str, limit: usize) -> Vec<Question> {
        let (key, bank) = match self.domains.get(domain).filter(|d| !d.questions.is_empty()) {
            Some(bank) => (domain, bank),
            None => {
                info!(domain, fallback = FALLBACK_DOMAIN, "unknown domain, using fallback bank");
                match self.domains.get(FALLBACK_DOMAIN).filter(|d| !d.questions.is_empty()) {
                    Some(bank) => (FALLBACK_DOMAIN, bank),
                    None => return builtin_fallback(limit),
                }
            }
        };

        let questions: Vec<Question> = bank
            .questions
            .iter()
            .take(limit.max(1))
            .enumerate()
            .map(|(index, text)| Question {
                text: text.clone(),
                reference: bank.references.get(index).cloned(),
            })
            .collect();
        debug!(domain = key, count = questions.len(), "questions selected");
        questions
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_fallback(limit: usize) -> Vec<Question> {
    GENERAL_QUESTIONS
        .iter()
        .take(limit.max(1))
        .enumerate()
        .map(|(index, text)| Question {
            text: text.to_string(),
            reference: GENERAL_REFERENCES.get(index).map(|r| r.to_string()),
        })
        .collect()
}
