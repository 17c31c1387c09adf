//! Interactive execution of a Sigma protocol.
//!
//! A [`ProverSession`] binds one protocol instance to one witness and walks the
//! three moves in order:
//!
//! ```text
//! Created --announce--> Announced --respond(c)--> Challenged --> Responded
//! ```
//!
//! The announcement randomness is consumed by the first response, so a session
//! answers exactly one challenge. Answering a second challenge with the same
//! randomness would leak the witness; a new session must be started instead.
//! The [`Verifier`] side is stateless.

use core::fmt;

use rand_core::{CryptoRng, RngCore};
use tracing::instrument;

use crate::errors::Error;
use crate::traits::{SigmaProtocol, Transcript};

/// Progress of a [`ProverSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Announced,
    /// The challenge was accepted and the announcement randomness consumed.
    Challenged,
    Responded,
}

/// The prover side of one protocol execution.
pub struct ProverSession<'a, P: SigmaProtocol> {
    protocol: &'a P,
    witness: P::Witness,
    state: Option<P::ProverState>,
    announcement: Option<P::Announcement>,
    challenge: Option<P::Challenge>,
    progress: SessionState,
}

impl<'a, P: SigmaProtocol> ProverSession<'a, P> {
    /// Bind `witness` to `protocol`.
    ///
    /// # Errors
    /// Whatever [`SigmaProtocol::check_witness`] reports, e.g.
    /// - [`Error::InvalidInstanceWitnessPair`] if the witness does not satisfy the relation;
    /// - [`Error::PolicyUnfulfillable`] if a policy has too few witnesses.
    pub fn new(protocol: &'a P, witness: P::Witness) -> Result<Self, Error> {
        protocol.check_witness(&witness)?;
        Ok(Self {
            protocol,
            witness,
            state: None,
            announcement: None,
            challenge: None,
            progress: SessionState::Created,
        })
    }

    pub fn state(&self) -> SessionState {
        self.progress
    }

    /// First move. Allowed once per session.
    #[instrument(skip_all)]
    pub fn announce(
        &mut self,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<P::Announcement, Error> {
        if self.progress != SessionState::Created {
            return Err(Error::ProtocolState("announce called twice".into()));
        }
        let (announcement, state) = self.protocol.prover_announce(&self.witness, rng)?;
        self.state = Some(state);
        self.announcement = Some(announcement.clone());
        self.progress = SessionState::Announced;
        Ok(announcement)
    }

    /// Third move: answer the verifier's challenge.
    ///
    /// # Errors
    /// - [`Error::ProtocolState`] before `announce` or on a second call.
    #[instrument(skip_all)]
    pub fn respond(&mut self, challenge: &P::Challenge) -> Result<P::Response, Error> {
        let state = match self.progress {
            SessionState::Created => {
                return Err(Error::ProtocolState("respond called before announce".into()))
            }
            SessionState::Challenged | SessionState::Responded => {
                return Err(Error::ProtocolState("respond called twice".into()))
            }
            SessionState::Announced => self
                .state
                .take()
                .ok_or_else(|| Error::ProtocolState("missing prover state".into()))?,
        };
        self.progress = SessionState::Challenged;
        self.challenge = Some(challenge.clone());
        let response = self.protocol.prover_response(state, challenge)?;
        self.progress = SessionState::Responded;
        Ok(response)
    }

    /// The announcement and challenge recorded so far.
    pub fn recorded(&self) -> (Option<&P::Announcement>, Option<&P::Challenge>) {
        (self.announcement.as_ref(), self.challenge.as_ref())
    }
}

impl<P: SigmaProtocol> fmt::Debug for ProverSession<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProverSession")
            .field("state", &self.progress)
            .finish_non_exhaustive()
    }
}

/// The verifier side of a protocol execution.
pub struct Verifier<'a, P: SigmaProtocol> {
    protocol: &'a P,
}

impl<'a, P: SigmaProtocol> Verifier<'a, P> {
    pub fn new(protocol: &'a P) -> Self {
        Self { protocol }
    }

    /// Second move: a uniformly random challenge.
    pub fn challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> P::Challenge {
        self.protocol.sample_challenge(rng)
    }

    pub fn verify(
        &self,
        announcement: &P::Announcement,
        challenge: &P::Challenge,
        response: &P::Response,
    ) -> Result<(), Error> {
        self.protocol.verifier(announcement, challenge, response)
    }

    pub fn verify_transcript(&self, transcript: &Transcript<P>) -> Result<(), Error> {
        self.verify(
            &transcript.announcement,
            &transcript.challenge,
            &transcript.response,
        )
    }
}

/// Runs the three moves between an honest prover and verifier.
pub fn run_interactive<P: SigmaProtocol>(
    protocol: &P,
    witness: P::Witness,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Transcript<P>, Error> {
    let mut session = ProverSession::new(protocol, witness)?;
    let verifier = Verifier::new(protocol);
    let announcement = session.announce(rng)?;
    let challenge = verifier.challenge(rng);
    let response = session.respond(&challenge)?;
    let transcript = Transcript {
        announcement,
        challenge,
        response,
    };
    verifier.verify_transcript(&transcript)?;
    Ok(transcript)
}
