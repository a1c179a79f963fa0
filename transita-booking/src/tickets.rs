use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use transita_core::repository::{BookingRepository, TicketGenerator};
use transita_shared::events::BookingConfirmedEvent;

/// Queue-backed submission into the downstream ticket rendering pipeline.
///
/// Submission is fire-and-forget: the confirmation path enqueues and returns
/// immediately, and generation failures surface only in logs. Payment
/// confirmation stays the source of truth; ticket artifacts are a derived
/// product that can be regenerated later.
pub struct TicketPipeline {
    tx: mpsc::UnboundedSender<BookingConfirmedEvent>,
}

impl TicketPipeline {
    /// Spawns the worker task draining the queue and returns the submission
    /// handle.
    pub fn start(
        generator: Arc<dyn TicketGenerator>,
        bookings: Arc<dyn BookingRepository>,
        retry_attempts: u32,
        retry_delay_ms: u64,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(
            rx,
            generator,
            bookings,
            retry_attempts.max(1),
            retry_delay_ms,
        ));
        Self { tx }
    }

    pub fn submit(&self, event: BookingConfirmedEvent) {
        if self.tx.send(event).is_err() {
            error!("Ticket pipeline queue is closed; dropping generation job");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<BookingConfirmedEvent>,
    generator: Arc<dyn TicketGenerator>,
    bookings: Arc<dyn BookingRepository>,
    retry_attempts: u32,
    retry_delay_ms: u64,
) {
    info!("Ticket generation worker started");
    while let Some(job) = rx.recv().await {
        generate_with_retry(&*generator, &*bookings, &job, retry_attempts, retry_delay_ms).await;
    }
}

async fn generate_with_retry(
    generator: &dyn TicketGenerator,
    bookings: &dyn BookingRepository,
    job: &BookingConfirmedEvent,
    retry_attempts: u32,
    retry_delay_ms: u64,
) {
    let mut delay = Duration::from_millis(retry_delay_ms);

    for attempt in 1..=retry_attempts {
        match generator.generate(job.booking_id).await {
            Ok(artifacts) => {
                if let Err(e) = bookings
                    .set_ticket_artifacts(job.booking_id, &artifacts.ticket_url, &artifacts.qr_code)
                    .await
                {
                    error!(
                        "Tickets generated for {} but persisting the artifacts failed: {}",
                        job.booking_reference, e
                    );
                } else {
                    info!("Tickets ready for {}", job.booking_reference);
                }
                return;
            }
            Err(e) => {
                warn!(
                    "Ticket generation attempt {}/{} failed for {}: {}",
                    attempt, retry_attempts, job.booking_reference, e
                );
                if attempt < retry_attempts {
                    sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    error!(
        "Ticket generation gave up for {}; booking stays confirmed, tickets can be regenerated",
        job.booking_reference
    );
}
