// src/exam/question_bank.rs

use crate::models::{exam_result::AnsweredQuestion, question::{Question, QuestionReview}};

/// Static question bank the exam draws from.
pub static QUESTION_BANK: &[Question] = &[
    Question {
        id: 1,
        prompt: "What does PWA stand for?",
        options: &[
            "Progressive Web Application",
            "Partial Web App",
            "Procedural Web App",
        ],
        correct_index: 0,
    },
    Question {
        id: 2,
        prompt: "Which file is essential for a PWA to be installable?",
        options: &["service-worker.js", "manifest.json", "index.html"],
        correct_index: 1,
    },
    Question {
        id: 3,
        prompt: "What is the primary role of a Service Worker?",
        options: &[
            "To style the web page",
            "To handle network requests and enable offline capabilities",
            "To manage databases",
        ],
        correct_index: 1,
    },
    Question {
        id: 4,
        prompt: "Which technology allows PWAs to store data offline?",
        options: &["Web Sockets", "Server-Sent Events", "IndexedDB"],
        correct_index: 2,
    },
    Question {
        id: 5,
        prompt: "For a PWA to be installable, it must be served over...",
        options: &["HTTP", "HTTPS", "FTP"],
        correct_index: 1,
    },
    Question {
        id: 6,
        prompt: "The 'Add to Home Screen' prompt is a feature of which PWA aspect?",
        options: &["Installability", "Responsiveness", "Connectivity-independence"],
        correct_index: 0,
    },
    Question {
        id: 7,
        prompt: "What does the 'background_color' property in the manifest file define?",
        options: &[
            "The app's font color",
            "The color of the browser toolbar",
            "The splash screen background color",
        ],
        correct_index: 2,
    },
    Question {
        id: 8,
        prompt: "Which API is used for sending push notifications in a PWA?",
        options: &["Fetch API", "Push API", "Cache API"],
        correct_index: 1,
    },
    Question {
        id: 9,
        prompt: "The 'App Shell' model in PWAs primarily improves...",
        options: &[
            "Security",
            "Performance and user experience",
            "Database integration",
        ],
        correct_index: 1,
    },
    Question {
        id: 10,
        prompt: "What is the purpose of the 'scope' property in a Service Worker registration?",
        options: &[
            "Defines which pages the service worker can control",
            "Limits the amount of cache storage",
            "Sets the color scheme of the app",
        ],
        correct_index: 0,
    },
];

pub fn find(question_id: i64) -> Option<&'static Question> {
    QUESTION_BANK.iter().find(|q| q.id == question_id)
}

/// Expands stored answers against the bank. Unknown question ids are skipped.
pub fn review(answers: &[AnsweredQuestion]) -> Vec<QuestionReview> {
    answers
        .iter()
        .filter_map(|a| find(a.question_id).map(|q| QuestionReview::new(q, a.answer)))
        .collect()
}
