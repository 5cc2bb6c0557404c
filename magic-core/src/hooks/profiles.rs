// magic-core/src/hooks/profiles.rs
//
// Built-in hook snippets.
//
// Every snippet follows the same cycle per command:
//   command_start  right before the command runs
//   command_end    right after it returns, before the prompt
//   prompt_start   right after command_end
//   prompt_end     as the last (zero-width) thing the prompt prints
//
// The markers are written as printf escapes, never as raw bytes, so the
// hook code itself stays free of live escape sequences (`set -x`, `type`,
// `functions` all show the escaped form). Existing PROMPT_COMMAND, precmd
// hooks and prompt functions are chained, and the exit status the user's
// prompt sees is preserved.

use crate::term::osc::MarkerKind;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// How a shell spells non-printable bytes inside a printf format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStyle {
    /// `\033` / `\007` (bash, zsh, POSIX printf)
    Octal,
    /// `\x1b` / `\x07` (fish)
    Hex,
}

/// The marker as printf escape text, derived from the wire bytes.
pub fn escaped(kind: MarkerKind, style: EscapeStyle) -> String {
    let mut out = String::new();
    for b in kind.bytes() {
        match (b, style) {
            (ESC, EscapeStyle::Octal) => out.push_str("\\033"),
            (BEL, EscapeStyle::Octal) => out.push_str("\\007"),
            (ESC, EscapeStyle::Hex) => out.push_str("\\x1b"),
            (BEL, EscapeStyle::Hex) => out.push_str("\\x07"),
            (b, _) => out.push(b as char),
        }
    }
    out
}

/// DEBUG trap for command_start, PROMPT_COMMAND for the rest.
///
/// The trap fires for every simple command, including the ones inside
/// PROMPT_COMMAND, so it only emits while armed. Arming is the very last
/// PROMPT_COMMAND step, which also re-appends the prompt_end marker to PS1
/// in case a prompt framework rebuilt PS1. On an empty line the first armed
/// trap is the one for `__magic_shell_precmd`; that one disarms silently.
///
/// A DEBUG trap installed by the user's rc file keeps running, from inside
/// ours, with the original `$?` and `$BASH_COMMAND`. PROMPT_COMMAND pieces
/// are joined with newlines so a user value ending in `;` still parses.
pub fn bash() -> Vec<String> {
    let start = escaped(MarkerKind::CommandStart, EscapeStyle::Octal);
    let end = escaped(MarkerKind::CommandEnd, EscapeStyle::Octal);
    let prompt_start = escaped(MarkerKind::PromptStart, EscapeStyle::Octal);
    let prompt_end = escaped(MarkerKind::PromptEnd, EscapeStyle::Octal);

    vec![
        "__magic_shell_armed=".to_string(),
        "__magic_shell_ran=".to_string(),
        "__magic_shell_user_debug=".to_string(),
        "__magic_shell_return() { return \"$1\"; }".to_string(),
        "__magic_shell_chain_debug() { local __magic_shell_trap; __magic_shell_trap=$(trap -p DEBUG); [ -n \"$__magic_shell_trap\" ] || return 0; eval \"set -- $__magic_shell_trap\"; [ \"$3\" = __magic_shell_preexec ] || __magic_shell_user_debug=$3; }".to_string(),
        "__magic_shell_chain_debug".to_string(),
        format!(
            "__magic_shell_preexec() {{ local __magic_shell_status=$?; if [ -n \"$__magic_shell_armed\" ]; then __magic_shell_armed=; if [ \"$BASH_COMMAND\" != __magic_shell_precmd ]; then __magic_shell_ran=1; printf '{start}'; fi; fi; if [ -n \"$__magic_shell_user_debug\" ]; then __magic_shell_return $__magic_shell_status; eval \"$__magic_shell_user_debug\"; fi; }}"
        ),
        format!(
            "__magic_shell_precmd() {{ local __magic_shell_status=$?; __magic_shell_armed=; if [ -n \"$__magic_shell_ran\" ]; then __magic_shell_ran=; printf '{end}'; fi; printf '{prompt_start}'; return $__magic_shell_status; }}"
        ),
        format!(
            "__magic_shell_arm() {{ local __magic_shell_status=$?; case \"$PS1\" in *'133;Q'*) ;; *) PS1=\"${{PS1}}\\[{prompt_end}\\]\" ;; esac; __magic_shell_armed=1; return $__magic_shell_status; }}"
        ),
        "trap '__magic_shell_preexec' DEBUG".to_string(),
        r#"PROMPT_COMMAND=$'__magic_shell_precmd\n'"$PROMPT_COMMAND"$'\n__magic_shell_arm'"#.to_string(),
    ]
}

/// preexec/precmd through add-zsh-hook, so user hooks stay in place.
pub fn zsh() -> Vec<String> {
    let start = escaped(MarkerKind::CommandStart, EscapeStyle::Octal);
    let end = escaped(MarkerKind::CommandEnd, EscapeStyle::Octal);
    let prompt_start = escaped(MarkerKind::PromptStart, EscapeStyle::Octal);
    let prompt_end = escaped(MarkerKind::PromptEnd, EscapeStyle::Octal);

    vec![
        "autoload -Uz add-zsh-hook".to_string(),
        format!("__magic_shell_preexec() {{ printf '{start}'; }}"),
        format!(
            "__magic_shell_precmd() {{ local __magic_shell_status=$?; printf '{end}{prompt_start}'; return $__magic_shell_status; }}"
        ),
        format!(
            "__magic_shell_mark_prompt() {{ local __magic_shell_status=$?; [[ $PROMPT == *'133;Q'* ]] || PROMPT=\"${{PROMPT}}%{{\"$'{prompt_end}'\"%}}\"; return $__magic_shell_status; }}"
        ),
        "add-zsh-hook preexec __magic_shell_preexec".to_string(),
        "add-zsh-hook precmd __magic_shell_precmd".to_string(),
        "add-zsh-hook precmd __magic_shell_mark_prompt".to_string(),
    ]
}

/// fish events for start/end/prompt_start, a wrapped fish_prompt for prompt_end.
pub fn fish() -> Vec<String> {
    let start = escaped(MarkerKind::CommandStart, EscapeStyle::Hex);
    let end = escaped(MarkerKind::CommandEnd, EscapeStyle::Hex);
    let prompt_start = escaped(MarkerKind::PromptStart, EscapeStyle::Hex);
    let prompt_end = escaped(MarkerKind::PromptEnd, EscapeStyle::Hex);

    vec![
        format!("function __magic_shell_preexec --on-event fish_preexec; printf '{start}'; end"),
        format!("function __magic_shell_postexec --on-event fish_postexec; printf '{end}'; end"),
        format!("function __magic_shell_prompt_start --on-event fish_prompt; printf '{prompt_start}'; end"),
        "functions -q fish_prompt; and functions -c fish_prompt __magic_shell_user_prompt".to_string(),
        format!(
            "function fish_prompt; functions -q __magic_shell_user_prompt; and __magic_shell_user_prompt; printf '{prompt_end}'; end"
        ),
    ]
}
