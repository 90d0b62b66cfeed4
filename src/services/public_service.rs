//! Service helpers that expose read-only public projections of the current quiz.

use crate::{
    dto::{
        common::{PhaseSnapshot, QuestionView},
        public::{
            HistogramBinDto, HistogramResponse, StandingEntry, StandingsResponse, WinnerEntry,
            WinnerResponse,
        },
    },
    error::ServiceError,
    services::game_service,
    state::{QuizPhase, SharedState, scoring},
};

/// Return the current phase snapshot.
pub async fn get_phase(state: &SharedState) -> PhaseSnapshot {
    game_service::phase_snapshot(state).await
}

/// Return the active question. The answer is revealed once the round is scored.
pub async fn get_current_question(state: &SharedState) -> Result<QuestionView, ServiceError> {
    let phase = state.phase().await;
    let (number, reveal) = displayed_question(state, phase)
        .ok_or_else(|| ServiceError::NotFound("no question is active".into()))?;
    let question = state
        .config()
        .question(number)
        .ok_or_else(|| ServiceError::InvalidState(format!("question {number} is not in the bank")))?;
    Ok(QuestionView::new(number, question, reveal))
}

/// Return the standings for the current phase.
pub async fn get_standings(state: &SharedState) -> StandingsResponse {
    let phase = state.phase().await;
    let sorted_by = match phase {
        QuizPhase::Results { .. } => "current_score",
        _ => "total_score",
    };

    StandingsResponse {
        phase: phase.into(),
        sorted_by: sorted_by.into(),
        standings: standings_for(state, phase).await,
    }
}

/// Ranked standings as displayed during `phase`. Equal scores share a rank.
pub async fn standings_for(state: &SharedState, phase: QuizPhase) -> Vec<StandingEntry> {
    let session = state.session().read().await;
    let sorted = scoring::standings(session.roster(), phase);
    let key = |score: (u32, u32)| match phase {
        QuizPhase::Results { .. } => score.0,
        _ => score.1,
    };

    let mut entries: Vec<StandingEntry> = Vec::with_capacity(sorted.len());
    for (index, participant) in sorted.into_iter().enumerate() {
        let score = key((participant.current_score, participant.total_score));
        let rank = match entries.last() {
            Some(previous) if key((previous.current_score, previous.total_score)) == score => {
                previous.rank
            }
            _ => index + 1,
        };
        entries.push(StandingEntry {
            rank,
            id: participant.id,
            name: participant.name.clone(),
            current_score: participant.current_score,
            total_score: participant.total_score,
        });
    }
    entries
}

/// Return the distribution of predictions for the question on display.
pub async fn get_histogram(state: &SharedState) -> Result<HistogramResponse, ServiceError> {
    let phase = state.phase().await;
    if !matches!(phase, QuizPhase::Results { .. } | QuizPhase::Final) {
        return Err(ServiceError::InvalidState(
            "the histogram is only available once a round is scored".into(),
        ));
    }
    let view = get_current_question(state).await?;

    let session = state.session().read().await;
    let predictions: Vec<u8> = session
        .roster()
        .filter_map(|participant| participant.answer_for(view.id))
        .collect();
    let correct = view.answer.unwrap_or_default();

    Ok(HistogramResponse {
        responses: predictions.len(),
        bins: scoring::histogram(predictions, correct)
            .into_iter()
            .map(HistogramBinDto::from)
            .collect(),
        question: view,
    })
}

/// Return the winner once the quiz is finished.
pub async fn get_winner(state: &SharedState) -> Result<WinnerResponse, ServiceError> {
    if state.phase().await != QuizPhase::Final {
        return Err(ServiceError::InvalidState("the quiz is not finished".into()));
    }

    let session = state.session().read().await;
    let winner = scoring::winner(session.roster())
        .ok_or_else(|| ServiceError::NotFound("no participants".into()))?;

    Ok(WinnerResponse {
        winner: WinnerEntry::from(winner.participant),
        tied_with: winner.tied_with.into_iter().map(WinnerEntry::from).collect(),
    })
}

/// Question number shown in `phase` and whether its answer is public.
fn displayed_question(state: &SharedState, phase: QuizPhase) -> Option<(usize, bool)> {
    match phase {
        QuizPhase::Registration => None,
        QuizPhase::Question { number } => Some((number, false)),
        QuizPhase::Results { number } => Some((number, true)),
        QuizPhase::Final => {
            let count = state.config().questions().len();
            (count > 0).then_some((count, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::{AppState, game::{Participant, QuizSession}}};

    fn participant(name: &str, current: u32, total: u32) -> Participant {
        let mut participant = Participant::new(name.into());
        participant.current_score = current;
        participant.total_score = total;
        participant
    }

    async fn state_with(phase: QuizPhase, participants: Vec<Participant>) -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .restore(phase, 1, QuizSession::from_participants(participants))
            .await;
        state
    }

    #[tokio::test]
    async fn ties_share_a_rank() {
        let state = state_with(
            QuizPhase::Final,
            vec![
                participant("Ada", 0, 20),
                participant("Bob", 0, 10),
                participant("Cy", 0, 20),
                participant("Di", 0, 30),
            ],
        )
        .await;

        let ranks: Vec<(String, usize)> = standings_for(&state, QuizPhase::Final)
            .await
            .into_iter()
            .map(|entry| (entry.name, entry.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![
                ("Bob".to_string(), 1),
                ("Ada".to_string(), 2),
                ("Cy".to_string(), 2),
                ("Di".to_string(), 4),
            ]
        );
    }

    #[tokio::test]
    async fn results_standings_use_round_score() {
        let state = state_with(
            QuizPhase::Results { number: 1 },
            vec![participant("Ada", 30, 30), participant("Bob", 5, 40)],
        )
        .await;

        let response = get_standings(&state).await;
        assert_eq!(response.sorted_by, "current_score");
        assert_eq!(response.standings[0].name, "Bob");
    }

    #[tokio::test]
    async fn no_question_during_registration() {
        let state = state_with(QuizPhase::Registration, Vec::new()).await;
        assert!(matches!(
            get_current_question(&state).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_question_hides_answer() {
        let state = state_with(QuizPhase::Question { number: 1 }, Vec::new()).await;
        let view = get_current_question(&state).await.unwrap();
        assert_eq!(view.number, 1);
        assert_eq!(view.answer, None);
    }

    #[tokio::test]
    async fn histogram_counts_only_answers() {
        let mut answered = Participant::new("Ada".into());
        let question = AppConfig::default().question(1).cloned().unwrap();
        answered.record_answer(question.id, 42);
        let state = state_with(
            QuizPhase::Results { number: 1 },
            vec![answered, Participant::new("Bob".into())],
        )
        .await;

        let histogram = get_histogram(&state).await.unwrap();
        assert_eq!(histogram.responses, 1);
        assert_eq!(histogram.bins.len(), 10);
        assert_eq!(histogram.bins[4].count, 1);
        assert_eq!(histogram.bins.iter().filter(|bin| bin.contains_answer).count(), 1);
    }

    #[tokio::test]
    async fn winner_only_when_finished() {
        let state = state_with(
            QuizPhase::Results { number: 1 },
            vec![participant("Ada", 0, 10)],
        )
        .await;
        assert!(matches!(
            get_winner(&state).await,
            Err(ServiceError::InvalidState(_))
        ));

        let state = state_with(
            QuizPhase::Final,
            vec![
                participant("Ada", 0, 10),
                participant("Bob", 0, 10),
                participant("Cy", 0, 12),
            ],
        )
        .await;
        let response = get_winner(&state).await.unwrap();
        assert_eq!(response.winner.name, "Ada");
        assert_eq!(response.tied_with.len(), 1);
        assert_eq!(response.tied_with[0].name, "Bob");
    }
}
