//! SMTP transport tests against an in-process fake server.

use courier_mail::*;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// Answers every command positively and returns the transcript of lines
/// the client sent.
async fn serve<S>(stream: S, advertise_starttls: bool) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();
    let mut transcript = String::new();
    let mut in_data = false;

    let _ = write.write_all(b"220 fake.smtp ESMTP ready\r\n").await;
    let _ = write.flush().await;

    while let Ok(Some(line)) = lines.next_line().await {
        transcript.push_str(&line);
        transcript.push('\n');

        if in_data {
            if line == "." {
                in_data = false;
                let _ = write.write_all(b"250 queued\r\n").await;
                let _ = write.flush().await;
            }
            continue;
        }

        let command = line.to_uppercase();
        let reply: &[u8] = if command.starts_with("EHLO") {
            if advertise_starttls {
                b"250-fake.smtp\r\n250 STARTTLS\r\n"
            } else {
                b"250 fake.smtp\r\n"
            }
        } else if command.starts_with("DATA") {
            in_data = true;
            b"354 end with .\r\n"
        } else if command.starts_with("QUIT") {
            let _ = write.write_all(b"221 bye\r\n").await;
            let _ = write.flush().await;
            break;
        } else {
            b"250 OK\r\n"
        };

        if write.write_all(reply).await.is_err() || write.flush().await.is_err() {
            break;
        }
    }

    transcript
}

/// Accepts one plaintext session.
async fn fake_server(advertise_starttls: bool) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, advertise_starttls).await
    });

    (port, handle)
}

/// Accepts one implicit-TLS session with a self-signed certificate for
/// 127.0.0.1. The transcript is empty when the client rejects the handshake.
async fn fake_tls_server() -> (u16, JoinHandle<String>) {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec!["127.0.0.1".to_string()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();
    let certs: Vec<CertificateDer<'static>> = vec![cert.der().clone()];
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(certs, key)
    .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        match acceptor.accept(stream).await {
            Ok(tls) => serve(tls, false).await,
            Err(_) => String::new(),
        }
    });

    (port, handle)
}

fn message() -> Email {
    Email::new()
        .from(Address::with_name("noreply@acme.test", "Acme").unwrap())
        .to(Address::new("ada@example.com").unwrap())
        .bcc(Address::new("audit@acme.test").unwrap())
        .subject("Hello")
        .html("<p>Hi Ada</p>")
}

fn plaintext(port: u16) -> SmtpConfig {
    SmtpConfig::new("127.0.0.1")
        .insecure()
        .port(port)
        .timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_send_over_plaintext_session() {
    let (port, server) = fake_server(false).await;
    let transport = SmtpTransport::new(plaintext(port)).unwrap();

    transport.send(&message()).await.unwrap();

    let transcript = server.await.unwrap();
    assert!(transcript.contains("MAIL FROM:<noreply@acme.test>"));
    assert!(transcript.contains("RCPT TO:<ada@example.com>"));
    assert!(transcript.contains("RCPT TO:<audit@acme.test>"));
    assert!(transcript.contains("Subject: Hello"));
    assert!(transcript.contains("Hi Ada"));
    assert!(!transcript.contains("Bcc:"));
}

#[tokio::test]
async fn test_mailer_sends_through_smtp() {
    let (port, server) = fake_server(false).await;
    let renderer = Renderer::new(HandlebarsEngine::default(), Branding::default());
    let mailer = Mailer::smtp(renderer, plaintext(port))
        .unwrap()
        .with_default_from(Address::new("noreply@acme.test").unwrap());

    mailer
        .send(&TemplateMail::html("<p>Welcome</p>").to("ada@example.com").subject("Hi"))
        .await
        .unwrap();

    let transcript = server.await.unwrap();
    assert!(transcript.contains("MAIL FROM:<noreply@acme.test>"));
}

#[tokio::test]
async fn test_smtp_requires_sender() {
    let transport = SmtpTransport::new(plaintext(2525)).unwrap();
    let email = Email::new().to(Address::new("ada@example.com").unwrap());

    let err = transport.send(&email).await.unwrap_err();
    assert!(matches!(err, MailError::Validation(_)));
}

#[tokio::test]
async fn test_connection_refused_is_delivery_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = SmtpTransport::new(plaintext(port)).unwrap();

    let err = transport.send(&message()).await.unwrap_err();
    assert!(err.is_delivery());
    assert!(matches!(err, MailError::Delivery { transport: "smtp", .. }));
}

#[tokio::test]
async fn test_required_starttls_without_server_support_fails() {
    let (port, _server) = fake_server(false).await;
    let config = SmtpConfig::new("127.0.0.1")
        .starttls()
        .port(port)
        .timeout(Duration::from_secs(5));
    let transport = SmtpTransport::new(config).unwrap();

    let err = transport.send(&message()).await.unwrap_err();
    assert!(err.is_delivery());
}

#[tokio::test]
async fn test_health_check_against_live_server() {
    let (port, _server) = fake_server(false).await;
    let transport = SmtpTransport::new(plaintext(port)).unwrap();

    assert!(transport.is_healthy().await);
}

fn implicit_tls(port: u16, certificates: CertificateValidation) -> SmtpConfig {
    SmtpConfig::new("127.0.0.1")
        .tls()
        .port(port)
        .timeout(Duration::from_secs(5))
        .certificate_validation(certificates)
}

#[tokio::test]
async fn test_self_signed_certificate_accepted_when_validation_disabled() {
    let (port, server) = fake_tls_server().await;
    let transport =
        SmtpTransport::new(implicit_tls(port, CertificateValidation::AcceptInvalid)).unwrap();

    transport.send(&message()).await.unwrap();

    let transcript = server.await.unwrap();
    assert!(transcript.contains("MAIL FROM:<noreply@acme.test>"));
    assert!(transcript.contains("Hi Ada"));
}

#[tokio::test]
async fn test_self_signed_certificate_rejected_by_default() {
    let (port, server) = fake_tls_server().await;
    let transport = SmtpTransport::new(implicit_tls(port, CertificateValidation::Verify)).unwrap();

    let err = transport.send(&message()).await.unwrap_err();
    assert!(matches!(err, MailError::Delivery { transport: "smtp", .. }));

    let transcript = server.await.unwrap();
    assert!(!transcript.contains("MAIL FROM"));
}
