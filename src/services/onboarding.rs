//! Post-registration questionnaire that produces the user's profile
//! description.

/// Description submitted when every question was skipped.
pub const SKIPPED_ALL: &str = "User skipped all questions";

/// How many bank suggestions are listed for one search.
pub const BANK_RESULTS_CAP: usize = 10;

pub const BANK_NAMES: &[&str] = &[
    "Bank Mandiri",
    "Bank Rakyat Indonesia (BRI)",
    "Bank Negara Indonesia (BNI)",
    "Bank Tabungan Negara (BTN)",
    "Bank Central Asia (BCA)",
    "Bank Danamon",
    "Bank Permata",
    "Bank CIMB Niaga",
    "Bank OCBC NISP",
    "Bank Maybank Indonesia",
    "Bank UOB Indonesia",
    "Bank Standard Chartered",
    "Bank HSBC Indonesia",
    "Bank Citibank Indonesia",
    "Bank Deutsche Bank Indonesia",
    "Bank DKI",
    "Bank Jateng",
    "Bank Jatim",
    "Bank Jabar Banten",
    "Bank Sumut",
    "Bank Sumsel Babel",
    "Bank Kaltim",
    "Bank Kalbar",
    "Bank Sulselbar",
    "Bank Papua",
    "Bank Mayapada",
    "Bank Mega",
    "Bank Sinarmas",
    "Bank BTPN",
    "Bank Akasia Mas",
    "Neo Bank Commerce",
    "Bank Jago",
    "Bank Seabank",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    FreeText,
    SingleSelect(&'static [&'static str]),
    BankSearch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Question {
    pub key: &'static str,
    pub prompt: &'static str,
    pub input: InputKind,
}

pub const QUESTIONS: &[Question] = &[
    Question {
        key: "banks_used",
        prompt: "Which banks do you currently use",
        input: InputKind::BankSearch,
    },
    Question {
        key: "investment_types",
        prompt: "What types of investments are you interested in",
        input: InputKind::FreeText,
    },
    Question {
        key: "risk_tolerance",
        prompt: "What is your risk tolerance",
        input: InputKind::SingleSelect(&["Conservative", "Moderate", "Aggressive"]),
    },
    Question {
        key: "news_presentation",
        prompt: "How would you like your news presented",
        input: InputKind::SingleSelect(&[
            "Short summaries",
            "Detailed analysis",
            "Key numbers and charts",
        ]),
    },
];

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Onboarding already completed")]
    AlreadyCompleted,
    #[error("Onboarding needs at least one question")]
    NoQuestions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Moved on to the question at this index.
    Next(usize),
    /// Final description, produced once.
    Completed(String),
}

/// Walks the questions one at a time. Single use: once it has produced a
/// description every further call fails.
#[derive(Debug)]
pub struct OnboardingSequencer {
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    index: usize,
    draft: String,
    completed: bool,
}

impl Default for OnboardingSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingSequencer {
    pub fn new() -> Self {
        Self {
            questions: QUESTIONS.to_vec(),
            answers: vec![None; QUESTIONS.len()],
            index: 0,
            draft: String::new(),
            completed: false,
        }
    }

    pub fn with_questions(questions: Vec<Question>) -> Result<Self, OnboardingError> {
        if questions.is_empty() {
            return Err(OnboardingError::NoQuestions);
        }

        Ok(Self {
            answers: vec![None; questions.len()],
            questions,
            index: 0,
            draft: String::new(),
            completed: false,
        })
    }

    pub fn current(&self) -> &Question {
        &self.questions[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.questions.len()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Answer being typed for the current question. Cleared on every move.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Records a non-blank answer for the current question, then moves on.
    pub fn advance(&mut self, answer: &str) -> Result<Step, OnboardingError> {
        self.ensure_open()?;

        let answer = answer.trim();
        if !answer.is_empty() {
            self.answers[self.index] = Some(answer.to_string());
        }
        Ok(self.step())
    }

    /// Submits the current draft.
    pub fn advance_draft(&mut self) -> Result<Step, OnboardingError> {
        let draft = std::mem::take(&mut self.draft);
        self.advance(&draft)
    }

    /// Moves on without recording anything for the current question.
    pub fn skip(&mut self) -> Result<Step, OnboardingError> {
        self.ensure_open()?;
        Ok(self.step())
    }

    fn ensure_open(&self) -> Result<(), OnboardingError> {
        if self.completed {
            return Err(OnboardingError::AlreadyCompleted);
        }
        Ok(())
    }

    fn step(&mut self) -> Step {
        self.draft.clear();
        if !self.is_last() {
            self.index += 1;
            return Step::Next(self.index);
        }

        self.completed = true;
        let description = self.describe();
        log::info!(
            "Onboarding finished with {} of {} answers",
            self.answers.iter().flatten().count(),
            self.questions.len()
        );
        Step::Completed(description)
    }

    fn describe(&self) -> String {
        let description = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter_map(|(question, answer)| {
                answer
                    .as_ref()
                    .map(|answer| format!("{}: {}", question.prompt, answer))
            })
            .collect::<Vec<_>>()
            .join(", ");

        if description.is_empty() {
            SKIPPED_ALL.to_string()
        } else {
            description
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankOption {
    Bank(&'static str),
    Other,
}

/// Case-insensitive substring match over [`BANK_NAMES`], capped at
/// [`BANK_RESULTS_CAP`].
pub fn matching_banks(query: &str) -> Vec<&'static str> {
    let query = query.trim().to_lowercase();
    BANK_NAMES
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(&query))
        .take(BANK_RESULTS_CAP)
        .collect()
}

/// Input state of the bank question: a live search that can switch to free
/// text through the "other" option.
#[derive(Debug, Default)]
pub struct BankSearch {
    query: String,
    free_text: bool,
}

impl BankSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_free_text(&self) -> bool {
        self.free_text
    }

    /// Matching banks followed by the "other" option.
    pub fn options(&self) -> Vec<BankOption> {
        let mut options: Vec<BankOption> = matching_banks(&self.query)
            .into_iter()
            .map(BankOption::Bank)
            .collect();
        options.push(BankOption::Other);
        options
    }

    /// Returns the chosen bank name, or `None` after switching to free text.
    pub fn select(&mut self, option: BankOption) -> Option<String> {
        match option {
            BankOption::Bank(name) => {
                self.free_text = false;
                Some(name.to_string())
            }
            BankOption::Other => {
                self.free_text = true;
                None
            }
        }
    }
}
