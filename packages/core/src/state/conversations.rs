// Список бесед: кеш загрузки, группировка, архив

use crate::api::{ChatApi, OpenConversationRequest};
use crate::config::Config;
use crate::storage::models::Conversation;
use crate::storage::ArchiveStorage;
use crate::utils::cache::TtlCache;
use crate::utils::error::Result;
use crate::utils::time::{local_midnight, parse_timestamp};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const ALL_CONVERSATIONS: &str = "all";

/// Беседы с одним собеседником
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerGroup {
    pub peer_user_id: i64,
    pub peer_user_name: Option<String>,
    pub peer_nick_name: Option<String>,
    pub peer_company_name: Option<String>,
    pub conversations: Vec<Conversation>,
    pub total_unread: u32,
    /// Превью самой свежей беседы группы
    pub last_time: Option<String>,
    pub last_content: Option<String>,
}

impl PeerGroup {
    fn start(conversation: &Conversation) -> Self {
        Self {
            peer_user_id: conversation.peer_user_id,
            peer_user_name: conversation.peer_user_name.clone(),
            peer_nick_name: conversation.peer_nick_name.clone(),
            peer_company_name: conversation.peer_company_name.clone(),
            conversations: vec![conversation.clone()],
            total_unread: conversation.unread_count,
            last_time: conversation.last_time.clone(),
            last_content: conversation.last_content.clone(),
        }
    }

    fn absorb(&mut self, conversation: &Conversation) {
        self.total_unread += conversation.unread_count;
        // строки ISO-8601 одного формата сравниваются лексикографически
        if conversation.last_time > self.last_time {
            self.last_time = conversation.last_time.clone();
            self.last_content = conversation.last_content.clone();
        }
        self.conversations.push(conversation.clone());
    }

    pub fn display_name(&self) -> String {
        self.conversations
            .first()
            .map(Conversation::peer_display_name)
            .unwrap_or_else(|| format!("User {}", self.peer_user_id))
    }

    /// Каждое поле проверяется отдельно, совпадение на стыке имён не считается
    fn matches(&self, keyword: &str) -> bool {
        [
            &self.peer_company_name,
            &self.peer_nick_name,
            &self.peer_user_name,
            &self.last_content,
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(keyword))
    }
}

/// Интервалы для группировки по давности
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyBucket {
    Today,
    Yesterday,
    LastSevenDays,
    Earlier,
}

impl RecencyBucket {
    pub const ALL: [RecencyBucket; 4] = [
        RecencyBucket::Today,
        RecencyBucket::Yesterday,
        RecencyBucket::LastSevenDays,
        RecencyBucket::Earlier,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecencyBucket::Today => "Today",
            RecencyBucket::Yesterday => "Yesterday",
            RecencyBucket::LastSevenDays => "Last 7 days",
            RecencyBucket::Earlier => "Earlier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecencyGroup {
    pub bucket: RecencyBucket,
    pub peers: Vec<PeerGroup>,
}

/// Разложить группы по давности относительно `now`.
///
/// Границы считаются от полуночи в часовом поясе `now`. Пустые интервалы
/// не возвращаются, порядок интервалов фиксирован.
pub fn group_by_recency_at<Tz: TimeZone>(
    groups: &[PeerGroup],
    keyword: Option<&str>,
    now: &DateTime<Tz>,
) -> Vec<RecencyGroup> {
    let keyword = keyword
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty());

    let tz = now.timezone();
    let today = local_midnight(now);
    let yesterday = today.clone() - ChronoDuration::days(1);
    let week = today.clone() - ChronoDuration::days(7);

    let mut buckets: Vec<RecencyGroup> = RecencyBucket::ALL
        .iter()
        .map(|bucket| RecencyGroup {
            bucket: *bucket,
            peers: Vec::new(),
        })
        .collect();

    for group in groups {
        if keyword.as_deref().is_some_and(|k| !group.matches(k)) {
            continue;
        }

        let bucket = match group.last_time.as_deref().and_then(|raw| parse_timestamp(raw, &tz)) {
            Some(at) if at >= today => RecencyBucket::Today,
            Some(at) if at >= yesterday => RecencyBucket::Yesterday,
            Some(at) if at >= week => RecencyBucket::LastSevenDays,
            _ => RecencyBucket::Earlier,
        };
        buckets[bucket as usize].peers.push(group.clone());
    }

    buckets.retain(|b| !b.peers.is_empty());
    buckets
}

/// То же относительно текущего локального времени
pub fn group_by_recency(groups: &[PeerGroup], keyword: Option<&str>) -> Vec<RecencyGroup> {
    group_by_recency_at(groups, keyword, &Local::now())
}

/// Список бесед пользователя
pub struct ConversationDirectory<S: ArchiveStorage> {
    conversations: Vec<Conversation>,
    archived: BTreeSet<i64>,
    storage: S,
    cache: TtlCache<&'static str, Vec<Conversation>>,
    active_conversation_id: Option<i64>,
}

impl<S: ArchiveStorage> ConversationDirectory<S> {
    /// Создать каталог; множество архива читается из хранилища сразу
    pub fn new(storage: S, cache_ttl: Duration) -> Self {
        use tracing::warn;

        let archived = storage.load_archived().unwrap_or_else(|e| {
            warn!("Failed to read archived conversations: {}", e);
            BTreeSet::new()
        });

        Self {
            conversations: Vec::new(),
            archived,
            storage,
            cache: TtlCache::new(cache_ttl),
            active_conversation_id: None,
        }
    }

    pub fn from_config(storage: S, config: &Config) -> Self {
        Self::new(storage, Duration::from_secs(config.directory_cache_ttl_secs))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // Загрузка
    // ========================================================================

    /// Загрузить список бесед; свежий ответ берётся из кеша
    pub async fn load<A: ChatApi>(&mut self, api: &A) -> Result<usize> {
        use tracing::{debug, warn};

        let conversations = self
            .cache
            .get_or_fetch(ALL_CONVERSATIONS, || api.list_conversations())
            .await
            .map_err(|e| {
                warn!("Failed to load conversations: {}", e);
                e
            })?;

        debug!("Conversation directory holds {} conversations", conversations.len());
        self.conversations = conversations;
        Ok(self.conversations.len())
    }

    /// Загрузить список в обход кеша
    pub async fn refresh<A: ChatApi>(&mut self, api: &A) -> Result<usize> {
        self.cache.invalidate(&ALL_CONVERSATIONS);
        self.load(api).await
    }

    /// Заменить список напрямую
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.cache.invalidate(&ALL_CONVERSATIONS);
        self.conversations = conversations;
    }

    /// Открыть беседу по (собеседник, предмет); повторный вызов даёт тот же id
    pub async fn open_conversation<A: ChatApi>(&mut self, api: &A, request: &OpenConversationRequest) -> Result<i64> {
        use tracing::info;

        if let Some(existing) = self.conversations.iter().find(|c| {
            c.peer_user_id == request.peer_user_id
                && c.subject_type == Some(request.subject_type)
                && c.subject_id == Some(request.subject_id)
        }) {
            return Ok(existing.id);
        }

        let id = api.open_conversation(request).await?;
        if self.get(id).is_none() {
            info!("Opened conversation {} with user {}", id, request.peer_user_id);
            self.conversations.push(Conversation::opened(
                id,
                request.peer_user_id,
                request.subject_type,
                request.subject_id,
                request.subject_snapshot_json.clone(),
            ));
            self.cache.invalidate(&ALL_CONVERSATIONS);
        }
        Ok(id)
    }

    /// Отметить беседу прочитанной; счётчик обнуляется только после ответа сервера
    pub async fn mark_read<A: ChatApi>(&mut self, api: &A, conversation_id: i64) -> Result<()> {
        use tracing::warn;

        if let Err(e) = api.mark_conversation_read(conversation_id).await {
            warn!("Failed to mark conversation {} read: {}", conversation_id, e);
            return Err(e);
        }
        if let Some(conversation) = self.get_mut(conversation_id) {
            conversation.unread_count = 0;
        }
        // иначе следующий load из кеша вернёт старый счётчик
        self.cache.update(&ALL_CONVERSATIONS, |cached| {
            if let Some(conversation) = cached.iter_mut().find(|c| c.id == conversation_id) {
                conversation.unread_count = 0;
            }
        });
        Ok(())
    }

    // ========================================================================
    // Локальные обновления
    // ========================================================================

    pub fn set_active(&mut self, conversation_id: Option<i64>) {
        self.active_conversation_id = conversation_id;
    }

    pub fn active_conversation_id(&self) -> Option<i64> {
        self.active_conversation_id
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.active_conversation_id.and_then(|id| self.get(id))
    }

    /// Обновить превью беседы; для неактивной беседы растёт счётчик.
    ///
    /// `false`, если беседа неизвестна.
    pub fn record_message(&mut self, conversation_id: i64, content: &str, time: String) -> bool {
        let is_active = self.active_conversation_id == Some(conversation_id);
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };

        conversation.last_content = Some(content.to_string());
        conversation.last_time = Some(time);
        if !is_active {
            conversation.unread_count += 1;
        }
        self.cache.invalidate(&ALL_CONVERSATIONS);
        true
    }

    pub fn get(&self, conversation_id: i64) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    fn get_mut(&mut self, conversation_id: i64) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == conversation_id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn peer_display_name(&self, conversation_id: i64) -> Option<String> {
        self.get(conversation_id).map(Conversation::peer_display_name)
    }

    // ========================================================================
    // Архив
    // ========================================================================

    pub fn archive(&mut self, conversation_id: i64) -> Result<()> {
        if self.archived.insert(conversation_id) {
            self.persist_archive()?;
        }
        Ok(())
    }

    pub fn restore(&mut self, conversation_id: i64) -> Result<()> {
        if self.archived.remove(&conversation_id) {
            self.persist_archive()?;
        }
        Ok(())
    }

    pub fn is_archived(&self, conversation_id: i64) -> bool {
        self.archived.contains(&conversation_id)
    }

    fn persist_archive(&mut self) -> Result<()> {
        use tracing::warn;

        self.storage.save_archived(&self.archived).map_err(|e| {
            warn!("Failed to persist archived conversations: {}", e);
            e
        })
    }

    pub fn active_conversations(&self) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| !self.is_archived(c.id))
            .collect()
    }

    pub fn archived_conversations(&self) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| self.is_archived(c.id))
            .collect()
    }

    /// Непрочитанные по всем неархивным беседам
    pub fn total_unread(&self) -> u32 {
        self.active_conversations().iter().map(|c| c.unread_count).sum()
    }

    // ========================================================================
    // Группировка
    // ========================================================================

    /// Неархивные беседы, сгруппированные по собеседнику, свежие первыми
    pub fn group_by_peer(&self) -> Vec<PeerGroup> {
        let mut groups: Vec<PeerGroup> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();

        for conversation in self.active_conversations() {
            match index.get(&conversation.peer_user_id) {
                Some(&i) => groups[i].absorb(conversation),
                None => {
                    index.insert(conversation.peer_user_id, groups.len());
                    groups.push(PeerGroup::start(conversation));
                }
            }
        }

        // сортировка стабильна: при равном времени сохраняется порядок сервера
        groups.sort_by(|a, b| b.last_time.cmp(&a.last_time));
        groups
    }

    pub fn group_by_recency_at<Tz: TimeZone>(&self, keyword: Option<&str>, now: &DateTime<Tz>) -> Vec<RecencyGroup> {
        group_by_recency_at(&self.group_by_peer(), keyword, now)
    }

    pub fn group_by_recency(&self, keyword: Option<&str>) -> Vec<RecencyGroup> {
        group_by_recency(&self.group_by_peer(), keyword)
    }
}
