//! Integration tests for the session engine.
//!
//! These tests drive a full session over a mock stream with predefined
//! server responses, asserting both the bytes sent and the resulting
//! session state. No real server is required.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use imap_engine::{
    Argument, Authority, Capability, Credential, Error, LiteralMode, LiteralOptions,
    LoginMechanism, PlainMechanism, Session, SessionState, Status, SyncMode, UntaggedResponse,
};

/// Shared log of every byte the session writes.
type SentLog = Arc<Mutex<Vec<u8>>>;

/// Mock stream returning predefined responses and recording sent bytes.
///
/// Once the responses are exhausted, reads either report EOF or stay
/// pending forever (for timeout tests).
#[derive(Debug)]
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: SentLog,
    pend_after_eof: bool,
}

impl MockStream {
    fn new(responses: &str) -> (Self, SentLog) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                responses: Cursor::new(responses.as_bytes().to_vec()),
                sent: Arc::clone(&sent),
                pend_after_eof: false,
            },
            sent,
        )
    }

    fn pending_after(responses: &str) -> (Self, SentLog) {
        let (mut stream, sent) = Self::new(responses);
        stream.pend_after_eof = true;
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap();
        let data = self.responses.get_ref();

        if pos >= data.len() {
            if self.pend_after_eof {
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const GREETING: &str = "* OK [CAPABILITY IMAP4rev1] server ready\r\n";
const PREAUTH_IDLE: &str = "* PREAUTH [CAPABILITY IMAP4rev1 IDLE LITERAL+] welcome\r\n";

async fn connect(responses: &str) -> (Session<MockStream>, SentLog) {
    let (stream, sent) = MockStream::new(responses);
    let authority = Authority::new("imap", "test.example.com", 143);
    let session = Session::from_stream(stream, authority).await.unwrap();
    (session, sent)
}

fn sent_text(sent: &SentLog) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

// --- greeting and state machine ------------------------------------------

#[tokio::test]
async fn ok_greeting_lands_in_not_authenticated() {
    let (session, _) = connect(GREETING).await;
    assert_eq!(session.state(), SessionState::NotAuthenticated);
    assert!(session.capabilities().has(&Capability::Imap4Rev1));
}

#[tokio::test]
async fn preauth_greeting_lands_in_authenticated() {
    let (session, _) = connect(PREAUTH_IDLE).await;
    assert_eq!(session.state(), SessionState::Authenticated);
    assert!(session.capabilities().has(&Capability::Idle));
}

#[tokio::test]
async fn bye_greeting_refuses_the_session() {
    let (stream, _) = MockStream::new("* BYE too many connections\r\n");
    let authority = Authority::new("imap", "test.example.com", 143);
    let err = Session::from_stream(stream, authority).await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[tokio::test]
async fn commands_in_the_wrong_state_fail_before_io() {
    let (mut session, sent) = connect(GREETING).await;

    let err = session.select("INBOX").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(sent_text(&sent), "", "nothing may reach the wire");
    assert_eq!(session.state(), SessionState::NotAuthenticated);
}

// --- login / select flow ---------------------------------------------------

#[tokio::test]
async fn login_and_select_track_mailbox_state() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1] server ready\r\n",
        "0000 OK [CAPABILITY IMAP4rev1 IDLE] logged in\r\n",
        "* FLAGS (\\Answered \\Seen)\r\n",
        "* 172 EXISTS\r\n",
        "* 1 RECENT\r\n",
        "* OK [UNSEEN 12] first unseen\r\n",
        "* OK [UIDVALIDITY 3857529045] UIDs valid\r\n",
        "* OK [UIDNEXT 4392] predicted next\r\n",
        "0001 OK [READ-WRITE] SELECT completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let login = session.login("alice", "secret").await.unwrap();
    assert!(login.is_ok());
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.authority().user.as_deref(), Some("alice"));

    let select = session.select("INBOX").await.unwrap();
    assert!(select.is_ok());
    assert_eq!(session.state(), SessionState::Selected);

    let mailbox = session.selected_mailbox().unwrap();
    assert_eq!(mailbox.name, "INBOX");
    assert_eq!(mailbox.exists, 172);
    assert_eq!(mailbox.recent, 1);
    assert_eq!(mailbox.first_unseen, Some(12));
    assert_eq!(mailbox.uid_validity, Some(3_857_529_045));
    assert_eq!(mailbox.uid_next, Some(4392));
    assert!(!mailbox.read_only);

    let wire = sent_text(&sent);
    assert!(wire.contains("0000 LOGIN alice secret\r\n"));
    assert!(wire.contains("0001 SELECT INBOX\r\n"));
}

#[tokio::test]
async fn login_without_piggyback_issues_implicit_capability() {
    let responses = concat!(
        "* OK ready\r\n",
        "0000 OK logged in\r\n",
        "* CAPABILITY IMAP4rev1 IDLE\r\n",
        "0001 OK CAPABILITY completed\r\n",
        "0002 OK NOOP completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    session.login("alice", "secret").await.unwrap();
    assert!(session.capabilities().has(&Capability::Idle));

    session.noop().await.unwrap();

    let wire = sent_text(&sent);
    assert!(wire.contains("0000 LOGIN"));
    assert!(wire.contains("0001 CAPABILITY\r\n"));
    assert!(wire.contains("0002 NOOP\r\n"));
}

#[tokio::test]
async fn failed_select_keeps_the_previous_selection() {
    let responses = concat!(
        "* PREAUTH welcome\r\n",
        "* 3 EXISTS\r\n",
        "0000 OK [READ-WRITE] selected\r\n",
        "0001 NO no such mailbox\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session.select("INBOX").await.unwrap();
    assert_eq!(session.selected_mailbox().unwrap().exists, 3);

    let result = session.select("Missing").await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(session.state(), SessionState::Selected);
    assert_eq!(session.selected_mailbox().unwrap().name, "INBOX");
}

#[tokio::test]
async fn expunge_floors_the_message_count_at_zero() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "* 1 EXISTS\r\n",
        "0000 OK [READ-WRITE] selected\r\n",
        "* 1 EXPUNGE\r\n",
        "* 1 EXPUNGE\r\n",
        "0001 OK NOOP completed\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session.select("INBOX").await.unwrap();
    session.noop().await.unwrap();
    assert_eq!(session.selected_mailbox().unwrap().exists, 0);
}

#[tokio::test]
async fn capability_snapshot_is_replaced_wholesale() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1 IDLE LITERAL+] ready\r\n",
        "* CAPABILITY IMAP4rev1\r\n",
        "0000 OK CAPABILITY completed\r\n",
    );
    let (mut session, _) = connect(responses).await;
    assert!(session.capabilities().has(&Capability::Idle));

    session.capability().await.unwrap();
    assert!(!session.capabilities().has(&Capability::Idle));
    assert!(!session.capabilities().has(&Capability::LiteralPlus));
}

// --- result and error mapping -----------------------------------------------

#[tokio::test]
async fn no_is_a_failed_result_not_an_error() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        "0000 NO [ALERT] invalid credentials\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let result = session.login("alice", "wrong").await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.status, Status::No);
    assert_eq!(result.text, "invalid credentials");
    assert_eq!(session.state(), SessionState::NotAuthenticated);
}

#[tokio::test]
async fn referral_policy_lenient_exposes_targets_on_the_result() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        "0000 NO [REFERRAL imap://alice@backup.example.com/] try elsewhere\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let result = session.login("alice", "secret").await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.referrals(), ["imap://alice@backup.example.com/"]);
}

#[tokio::test]
async fn referral_policy_strict_raises() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        "0000 NO [REFERRAL imap://alice@backup.example.com/] try elsewhere\r\n",
    );
    let (mut session, _) = connect(responses).await;
    session.referral_as_error(true);

    let err = session.login("alice", "secret").await.unwrap_err();
    match err {
        Error::Referral(targets) => {
            assert_eq!(targets, ["imap://alice@backup.example.com/"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // A referral is not a framing fault.
    assert_eq!(session.state(), SessionState::NotAuthenticated);
}

#[tokio::test]
async fn bad_is_an_error_but_not_fatal() {
    let responses = concat!(
        "* PREAUTH welcome\r\n",
        "0000 BAD unknown command\r\n",
        "0001 OK NOOP completed\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let err = session.execute("X-BOGUS", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Bad(_)));
    assert_eq!(session.state(), SessionState::Authenticated);

    // The connection is still usable.
    assert!(session.noop().await.unwrap().is_ok());
}

#[tokio::test]
async fn tag_mismatch_tears_the_session_down() {
    let responses = concat!("* PREAUTH welcome\r\n", "9999 OK wrong tag\r\n");
    let (mut session, _) = connect(responses).await;

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(session.state(), SessionState::NotConnected);

    // Every subsequent command fails without touching the wire.
    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn bye_during_a_command_tears_the_session_down() {
    let responses = concat!("* PREAUTH welcome\r\n", "* BYE shutting down\r\n");
    let (mut session, _) = connect(responses).await;

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Bye(_)));
    assert_eq!(session.state(), SessionState::NotConnected);
}

#[tokio::test]
async fn logout_accepts_bye_before_the_terminal() {
    let responses = concat!(
        "* PREAUTH welcome\r\n",
        "* BYE logging out\r\n",
        "0000 OK LOGOUT completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    session.logout().await.unwrap();
    assert_eq!(session.state(), SessionState::NotConnected);
    assert!(sent_text(&sent).contains("0000 LOGOUT\r\n"));
}

// --- timeouts ---------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transaction_timeout_is_fatal() {
    let (stream, _) = MockStream::pending_after("* PREAUTH welcome\r\n");
    let authority = Authority::new("imap", "test.example.com", 143);
    let mut session = Session::from_stream(stream, authority).await.unwrap();
    session
        .set_transaction_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    session.set_receive_timeout(None).unwrap();

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(session.state(), SessionState::NotConnected);

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test(start_paused = true)]
async fn receive_timeout_is_fatal() {
    let (stream, _) = MockStream::pending_after("* PREAUTH welcome\r\n");
    let authority = Authority::new("imap", "test.example.com", 143);
    let mut session = Session::from_stream(stream, authority).await.unwrap();

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(session.state(), SessionState::NotConnected);
}

// --- literals and capability gating -----------------------------------------

#[tokio::test]
async fn synchronizing_literal_waits_for_the_continuation() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
        "0000 OK APPEND completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let result = session
        .append("INBOX", &[], b"hello".to_vec(), LiteralOptions::default())
        .await
        .unwrap();
    assert!(result.is_ok());

    let wire = sent_text(&sent);
    assert!(wire.contains("0000 APPEND INBOX {5}\r\n"));
    assert!(wire.ends_with("{5}\r\nhello\r\n"));
}

#[tokio::test]
async fn non_sync_literal_is_used_when_advertised() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 LITERAL+] welcome\r\n",
        "0000 OK APPEND completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let result = session
        .append(
            "INBOX",
            &[],
            b"hello".to_vec(),
            LiteralOptions::non_sync_if_capable(),
        )
        .await
        .unwrap();
    assert!(result.is_ok());
    assert!(sent_text(&sent).contains("{5+}\r\nhello"));
}

#[tokio::test]
async fn unconditional_literal_form_is_gated_strictly() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
        "0000 OK APPEND completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let options = LiteralOptions {
        sync: SyncMode::NonSynchronizing,
        mode: LiteralMode::Literal,
    };
    let err = session
        .append("INBOX", &[], b"hello".to_vec(), options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Incapable(Capability::LiteralPlus)));
    assert_eq!(sent_text(&sent), "", "incapability is detected before I/O");

    // The failed attempt consumed no tag.
    let result = session
        .append("INBOX", &[], b"hello".to_vec(), LiteralOptions::default())
        .await
        .unwrap();
    assert_eq!(result.tag, "0000");
}

// --- idle -----------------------------------------------------------------

#[tokio::test]
async fn idle_callback_can_end_the_wait_early() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 IDLE LITERAL+] welcome\r\n",
        "* 3 EXISTS\r\n",
        "0000 OK [READ-WRITE] selected\r\n",
        "+ idling\r\n",
        "* 4 EXISTS\r\n",
        "0001 OK IDLE terminated\r\n",
    );
    let (mut session, sent) = connect(responses).await;
    session.select("INBOX").await.unwrap();

    let mut seen = Vec::new();
    let clean = session
        .idle_with(Duration::from_secs(60), &mut seen, |seen, response| {
            if let UntaggedResponse::Exists(n) = response {
                seen.push(*n);
            }
            Ok(false)
        })
        .await
        .unwrap();

    assert!(clean);
    assert_eq!(seen, [4]);
    assert_eq!(session.selected_mailbox().unwrap().exists, 4);
    assert!(!session.is_idling());

    let wire = sent_text(&sent);
    assert!(wire.contains("0001 IDLE\r\n"));
    assert!(wire.ends_with("DONE\r\n"));
}

#[tokio::test]
async fn idle_requires_the_capability_regardless_of_policy() {
    let (mut session, sent) = connect("* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n").await;
    session.incapable_as_error(false);

    let err = session.begin_idle().await.unwrap_err();
    assert!(matches!(err, Error::Incapable(Capability::Idle)));
    assert_eq!(sent_text(&sent), "");
}

#[tokio::test]
async fn bye_during_idle_ends_the_wait_without_an_error() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 IDLE] welcome\r\n",
        "+ idling\r\n",
        "* BYE server shutting down\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let clean = session.idle(Duration::from_secs(60)).await.unwrap();
    assert!(!clean);
    assert_eq!(session.state(), SessionState::NotConnected);
}

#[tokio::test]
async fn idle_callback_error_tears_the_session_down() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 IDLE] welcome\r\n",
        "+ idling\r\n",
        "* 2 EXISTS\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let err = session
        .idle_with(Duration::from_secs(60), &mut (), |_, _| {
            Err(Error::Protocol("watcher gave up".to_string()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(session.state(), SessionState::NotConnected);
    assert!(!session.is_idling());
}

#[tokio::test]
async fn refused_idle_handshake_raises_no() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 IDLE] welcome\r\n",
        "0000 NO administrative limit\r\n",
    );
    let (mut session, _) = connect(responses).await;

    let err = session.begin_idle().await.unwrap_err();
    assert!(matches!(err, Error::No(_)));
    assert!(!session.is_idling());
    assert!(!session.is_transaction_proceeding());
}

// --- streamed append ---------------------------------------------------------

#[tokio::test]
async fn known_length_append_streams_and_completes_on_close() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
        "0000 OK APPEND completed\r\n",
        "0001 OK NOOP completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    session
        .begin_append("INBOX", &[], Some(5), LiteralOptions::default())
        .await
        .unwrap();
    session.append_write(b"he").await.unwrap();
    // Bytes past the declared length are discarded.
    session.append_write(b"llo, world").await.unwrap();
    session.finish_append().await.unwrap();

    let result = session.append_result().await.unwrap();
    assert!(result.is_ok());

    // The transaction slot is free again.
    session.noop().await.unwrap();

    let wire = sent_text(&sent);
    assert!(wire.contains("0000 APPEND INBOX {5}\r\nhello\r\n"));
    assert!(wire.contains("0001 NOOP\r\n"));
}

#[tokio::test]
async fn closing_a_known_length_append_short_is_a_framing_fault() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session
        .begin_append("INBOX", &[], Some(5), LiteralOptions::default())
        .await
        .unwrap();
    session.append_write(b"he").await.unwrap();

    let err = session.finish_append().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(session.state(), SessionState::NotConnected);
}

#[tokio::test]
async fn unknown_length_append_buffers_and_frames_on_close() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 LITERAL+] welcome\r\n",
        "0000 OK APPEND completed\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    session
        .begin_append("INBOX", &[], None, LiteralOptions::non_sync_if_capable())
        .await
        .unwrap();
    assert_eq!(sent_text(&sent), "", "nothing is sent until the body closes");

    session.append_write(b"hello ").await.unwrap();
    session.append_write(b"world").await.unwrap();
    session.finish_append().await.unwrap();

    let result = session.append_result().await.unwrap();
    assert!(result.is_ok());
    assert!(sent_text(&sent).contains("0000 APPEND INBOX {11+}\r\nhello world\r\n"));
}

#[tokio::test]
async fn premature_no_disables_writes_but_keeps_the_result() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "0000 NO [ALERT] quota exceeded\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    session
        .begin_append("INBOX", &[], Some(5), LiteralOptions::default())
        .await
        .unwrap();
    session.append_write(b"hello").await.unwrap();
    session.finish_append().await.unwrap();

    let result = session.append_result().await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(result.text, "quota exceeded");

    let wire = sent_text(&sent);
    assert!(wire.ends_with("{5}\r\n"), "no body bytes after the refusal");
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn completed_append_frees_the_slot_without_a_result_fetch() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
        "0000 OK APPEND completed\r\n",
        "0001 OK NOOP completed\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session
        .begin_append("INBOX", &[], Some(5), LiteralOptions::default())
        .await
        .unwrap();
    session.append_write(b"hello").await.unwrap();
    session.finish_append().await.unwrap();

    // The terminal was collected on close; no result fetch is required.
    assert!(session.noop().await.unwrap().is_ok());

    // The stored result stays retrievable afterwards.
    let result = session.append_result().await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.tag, "0000");
}

#[tokio::test]
async fn second_append_result_fetch_is_rejected() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1] welcome\r\n",
        "+ go ahead\r\n",
        "0000 OK APPEND completed\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session
        .begin_append("INBOX", &[], Some(5), LiteralOptions::default())
        .await
        .unwrap();
    session.append_write(b"hello").await.unwrap();
    session.finish_append().await.unwrap();

    assert!(session.append_result().await.unwrap().is_ok());

    let err = session.append_result().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn pending_append_blocks_other_transactions() {
    let responses = concat!(
        "* PREAUTH [CAPABILITY IMAP4rev1 LITERAL+] welcome\r\n",
    );
    let (mut session, _) = connect(responses).await;

    session
        .begin_append("INBOX", &[], None, LiteralOptions::non_sync_if_capable())
        .await
        .unwrap();

    let err = session.noop().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = session.begin_idle().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = session.set_receive_timeout(None).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

// --- authentication ----------------------------------------------------------

#[tokio::test]
async fn authenticate_plain_uses_sasl_ir_when_advertised() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=PLAIN] ready\r\n",
        "0000 OK [CAPABILITY IMAP4rev1] authenticated\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let mut mechanism = PlainMechanism::new(Credential::new("alice", "secret"));
    let result = session.authenticate(&mut mechanism).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.authority().user.as_deref(), Some("alice"));

    let blob = BASE64.encode(b"\0alice\0secret");
    assert_eq!(sent_text(&sent), format!("0000 AUTHENTICATE PLAIN {blob}\r\n"));
}

#[tokio::test]
async fn authenticate_login_answers_both_challenges() {
    let responses = concat!(
        "* OK [CAPABILITY IMAP4rev1 AUTH=LOGIN] ready\r\n",
        "+ VXNlcm5hbWU6\r\n",
        "+ UGFzc3dvcmQ6\r\n",
        "0000 OK [CAPABILITY IMAP4rev1] authenticated\r\n",
    );
    let (mut session, sent) = connect(responses).await;

    let mut mechanism = LoginMechanism::new(Credential::new("alice", "secret"));
    let result = session.authenticate(&mut mechanism).await.unwrap();
    assert!(result.is_ok());

    let wire = sent_text(&sent);
    assert!(wire.starts_with("0000 AUTHENTICATE LOGIN\r\n"));
    assert!(wire.contains(&format!("{}\r\n", BASE64.encode(b"alice"))));
    assert!(wire.contains(&format!("{}\r\n", BASE64.encode(b"secret"))));
}

#[tokio::test]
async fn unadvertised_mechanism_follows_the_incapability_policy() {
    let (mut session, sent) =
        connect("* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n").await;

    let mut mechanism = LoginMechanism::new(Credential::new("alice", "secret"));
    let err = session.authenticate(&mut mechanism).await.unwrap_err();
    assert!(matches!(err, Error::Incapable(Capability::Auth(_))));

    session.incapable_as_error(false);
    let result = session.authenticate(&mut mechanism).await.unwrap();
    assert!(!result.is_ok());
    assert_eq!(sent_text(&sent), "", "refused locally, before any I/O");
}

#[tokio::test]
async fn login_is_refused_locally_when_disabled() {
    let (mut session, sent) =
        connect("* OK [CAPABILITY IMAP4rev1 LOGINDISABLED STARTTLS] ready\r\n").await;

    let err = session.login("alice", "secret").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(sent_text(&sent), "");
}

#[tokio::test]
async fn login_is_idempotent_once_authenticated() {
    let (mut session, sent) = connect(PREAUTH_IDLE).await;

    let result = session.login("alice", "secret").await.unwrap();
    assert!(result.is_ok());
    assert_eq!(sent_text(&sent), "", "no bytes for a no-op login");
}
