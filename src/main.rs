//! Promoforge - conversational marketing-content generation client
//!
//! Terminal front end for the generation backend: walks the guided
//! dialogue, streams generation progress, and routes post-generation
//! modification requests through the intent classifier.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod content;
mod conversation;
mod core;
mod dialog;
mod intent;
mod stream;

use crate::api::ApiClient;
use crate::config::{Config, Profile};
use crate::conversation::{Attachment, Conversation, Message};
use crate::core::{GenerationCoordinator, PendingUpload, RegenerateParams};
use crate::dialog::{Advance, DialogEngine};
use crate::intent::{
    resolve_action, KeywordClassifier, ModificationAction, RegenerateOp, MODIFICATION_OPTIONS,
    TONE_OPTIONS,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promoforge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let profile = match std::env::var("PROMOFORGE_PROFILE") {
        Ok(path) => Profile::from_file(Path::new(&path))?,
        Err(_) => Profile::default(),
    };
    let classifier = KeywordClassifier::new(profile.keyword_sets());

    let api = ApiClient::new(&config)?;
    let mut coordinator = GenerationCoordinator::new(api);
    let mut engine = DialogEngine::new();
    let mut conversation = Conversation::new();

    tracing::info!(base_url = %config.base_url, "promoforge ready");

    let first = engine.first_prompt();
    show_assistant(&first);
    conversation.push(first);

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        // Attach a product image; it is uploaded just before generation.
        if let Some(path) = input.strip_prefix("/attach ") {
            attach_image(path.trim(), &mut coordinator, &mut conversation);
            continue;
        }

        if engine.is_complete() {
            let restart = handle_modification(
                input,
                &classifier,
                &mut coordinator,
                &mut conversation,
            )
            .await;
            if restart {
                coordinator.reset();
                engine = DialogEngine::new();
                conversation = Conversation::new();
                let first = engine.first_prompt();
                show_assistant(&first);
                conversation.push(first);
            }
            continue;
        }

        conversation.add_user(input);
        let multi = engine
            .current_step()
            .map(|s| s.allows_multiple())
            .unwrap_or(false);

        let outcome = if multi && input != "선택 완료" {
            for option in input.split(',') {
                if let Err(e) = engine.toggle(option.trim()) {
                    push_assistant(&mut conversation, &e.to_string(), None);
                }
            }
            println!("선택됨: {} (\"선택 완료\"로 확정)", engine.selection().join(", "));
            continue;
        } else if multi {
            engine.confirm(coordinator.info_mut())
        } else {
            engine.advance(input, coordinator.info_mut())
        };

        match outcome {
            Ok(Advance::Next(prompt)) => {
                show_assistant(&prompt);
                conversation.push(prompt);
            }
            Ok(Advance::Ready) => {
                run_generation(&mut coordinator, &mut conversation).await;
            }
            Err(e) => {
                push_assistant(&mut conversation, &e.to_string(), None);
            }
        }
    }

    Ok(())
}

fn attach_image(
    path: &str,
    coordinator: &mut GenerationCoordinator,
    conversation: &mut Conversation,
) {
    let path = PathBuf::from(path);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    conversation.push(
        Message::user(format!("📎 {}", file_name)).with_attachment(Attachment {
            file_name: file_name.clone(),
            path: path.clone(),
        }),
    );
    coordinator.set_pending_upload(PendingUpload { file_name, path });
    println!("제품 이미지가 첨부되었습니다. 계속 진행해주세요.");
}

async fn run_generation(
    coordinator: &mut GenerationCoordinator,
    conversation: &mut Conversation,
) {
    push_assistant(
        conversation,
        "알겠습니다! 제품 정보를 분석하고 최적의 타겟층을 자동으로 선정한 뒤, 트렌드에 맞는 마케팅 콘텐츠를 생성하고 있습니다...",
        None,
    );

    let result = coordinator.generate_full(print_progress).await;
    match result {
        Ok(artifact) => {
            let summary = summarize(artifact);
            println!("{}", summary);
            push_assistant(
                conversation,
                "✨ 콘텐츠 생성이 완료되었습니다!\n\n수정이 필요하시면 아래 옵션을 선택하거나 직접 입력해주세요.",
                Some(&MODIFICATION_OPTIONS),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "generation failed");
            push_assistant(conversation, &e.user_message(), None);
        }
    }
}

async fn handle_modification(
    input: &str,
    classifier: &KeywordClassifier,
    coordinator: &mut GenerationCoordinator,
    conversation: &mut Conversation,
) -> bool {
    conversation.add_user(input);

    let (op, params, ack) = match resolve_action(input, classifier) {
        ModificationAction::StartOver => return true,
        ModificationAction::ToneMenu => {
            push_assistant(
                conversation,
                "어떤 톤으로 카피를 변경하시겠어요? 원하시는 스타일을 선택해주세요!",
                Some(&TONE_OPTIONS),
            );
            return false;
        }
        ModificationAction::ChangeTone(tone) => (
            RegenerateOp::Copy,
            RegenerateParams {
                custom_request: None,
                tone: Some(tone),
            },
            "좋습니다! 선택하신 톤으로 카피를 다시 작성하겠습니다. 📝",
        ),
        ModificationAction::Regenerate { op, custom_request } => {
            let ack = match op {
                RegenerateOp::All => "알겠습니다! 요청하신 내용을 반영하여 전체 콘텐츠를 다시 생성하겠습니다. 잠시만 기다려주세요! ✨",
                RegenerateOp::Image => "네! 카피는 그대로 유지하고 이미지만 새롭게 생성하겠습니다. 🎨",
                RegenerateOp::Copy => "알겠습니다! 이미지는 그대로 두고 카피 문구만 새롭게 작성하겠습니다. ✍️",
            };
            (
                op,
                RegenerateParams {
                    custom_request,
                    tone: None,
                },
                ack,
            )
        }
    };

    push_assistant(conversation, ack, None);

    match coordinator.regenerate(op, params, print_progress).await {
        Ok(artifact) => {
            let summary = summarize(artifact);
            println!("{}", summary);
            push_assistant(
                conversation,
                "✨ 수정이 완료되었습니다!\n\n추가 수정이 필요하시면 아래 옵션을 선택해주세요.",
                Some(&MODIFICATION_OPTIONS),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "regeneration failed");
            push_assistant(conversation, &e.user_message(), None);
        }
    }
    false
}

fn print_progress(step: u32, total: u32, message: &str) {
    println!("  [{}/{}] {}", step + 1, total, message);
}

fn summarize(artifact: &content::GeneratedArtifact) -> String {
    let mut out = String::new();
    out.push_str("\n--- 생성 결과 ---\n");
    if !artifact.selected_strategy.name.is_empty() {
        out.push_str(&format!(
            "전략: {} ({})\n",
            artifact.selected_strategy.name, artifact.selected_strategy.core_message
        ));
    }
    out.push_str(&format!("카피 [{}]: {}\n", artifact.copy.tone, artifact.copy.text));
    if !artifact.copy.hashtags.is_empty() {
        out.push_str(&format!("해시태그: {}\n", artifact.copy.hashtags.join(" ")));
    }
    let image_url = artifact
        .image
        .local_url
        .as_deref()
        .unwrap_or(&artifact.image.original_url);
    if !image_url.is_empty() {
        out.push_str(&format!("이미지: {}\n", image_url));
    }
    out.push_str("-----------------");
    out
}

fn show_assistant(message: &Message) {
    println!("\n{}", message.content);
    if let Some(options) = &message.options {
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }
    }
}

fn push_assistant(conversation: &mut Conversation, content: &str, options: Option<&[&str]>) {
    let mut message = Message::assistant(content);
    if let Some(options) = options {
        message = message.with_options(options.iter().map(|o| o.to_string()).collect());
    }
    show_assistant(&message);
    conversation.push(message);
}
