//! Prompt templates sent to the completion API.
//!
//! Both user-facing prompts end with the same closing invitation, produced by
//! [`invitation_prompt`], so the consultation offer reads the same whether the
//! user asked a question or requested a recipe.

use rand::Rng;

/// Characters Telegram's MarkdownV2 requires to be escaped.
pub const ESCAPE_SYMBOLS: &str = "_ * [ ] ( ) ~ ` > # + - = | { } . !";

/// Cuisines a recipe may be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cuisine {
    Italian,
    Japanese,
    Georgian,
    Mexican,
    Indian,
    Greek,
    Thai,
}

impl Cuisine {
    pub const ALL: [Cuisine; 7] = [
        Cuisine::Italian,
        Cuisine::Japanese,
        Cuisine::Georgian,
        Cuisine::Mexican,
        Cuisine::Indian,
        Cuisine::Greek,
        Cuisine::Thai,
    ];

    /// Adjective as it reads in "рецепт ... кухни".
    pub fn name(self) -> &'static str {
        match self {
            Cuisine::Italian => "итальянской",
            Cuisine::Japanese => "японской",
            Cuisine::Georgian => "грузинской",
            Cuisine::Mexican => "мексиканской",
            Cuisine::Indian => "индийской",
            Cuisine::Greek => "греческой",
            Cuisine::Thai => "тайской",
        }
    }

    /// Uniform pick over [`Cuisine::ALL`].
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Cuisine {
        Cuisine::ALL[rng.gen_range(0..Cuisine::ALL.len())]
    }
}

/// Instructions for the closing invitation shared by every prompt.
pub fn invitation_prompt() -> String {
    "Приглашение должно начинаться с трех подходящих по смыслу эмодзи, \
быть написано в деловом стиле и ненавязчиво приглашать на двухмесячное ведение. \
В приглашении обязательно упомяни Двойнишникову Дарью, дипломированного нутрициолога, \
к которой можно обратиться в личные сообщения, чтобы задать уточняющие вопросы, \
расшифровать анализы и получить рекомендации по питанию и приему витаминов и минералов."
        .to_string()
}

/// Prompt answering a free-text request from the user.
pub fn recommendation_prompt(user_text: &str) -> String {
    format!(
        "Напиши на основе полученного запроса клиента: {user_text} \
(учти, что в запросе содержится и конечный результат) краткое, но емкое решение его проблемы. \
Также учти, что клиент хочет улучшить свое качество жизни через питание и прием витаминов и минералов, \
а также поддержание здорового образа жизни.

Формат ответа:
- Ответ не должен быть больше чем три предложения.
- Ответ должен быть структурированным и легко читаемым.
- Ответ должен быть дан в форме текста без использования markdown или html разметки.
- Допускается использовать перенос строки, * для выделения текста жирным шрифтом, - для маркировки пунктов, _ для курсива, больше ничего использовать нельзя.
- По всему тексту ответа символы {ESCAPE_SYMBOLS} должны быть экранированы.
- Ответ должен быть дан в поддерживаемом мессенджером Telegram формате, пример ответа:
```markdown
текст ответа тут
```

Закончить ответ нужно четвертым предложением, отдельным от предыдущих трех.
{invitation}

Перед отправкой ответа проверь его на наличие ошибок и опечаток.",
        invitation = invitation_prompt(),
    )
}

/// Prompt for a recipe from a cuisine chosen by `rng`.
pub fn recipe_prompt<R: Rng + ?Sized>(rng: &mut R) -> String {
    recipe_prompt_for(Cuisine::random(rng))
}

pub fn recipe_prompt_for(cuisine: Cuisine) -> String {
    format!(
        "Напиши полезный для здоровья рецепт {cuisine} кухни, которым хочется поделиться с другими.
Рецепт должен быть уникальным и содержать не более 5 ингредиентов.
Если какой-то ингредиент сложно найти в обычном магазине, предложи доступную замену.
Рецепт должен быть простым и быстрым в приготовлении.
Укажи количество порций, время приготовления и калорийность.
Объясни, почему этот рецепт полезен.
Рецепт должен быть описан простыми и понятными словами, в форме текста без использования markdown или html разметки.

Закончить рецепт нужно приглашением, отдельным от рецепта.
{invitation}

Перед отправкой ответа проверь его на наличие ошибок и опечаток.",
        cuisine = cuisine.name(),
        invitation = invitation_prompt(),
    )
}
