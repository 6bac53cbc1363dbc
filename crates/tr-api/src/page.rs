//! Embedded chat page

/// Render the chat page for `domain`
pub fn render_index(domain: &str) -> String {
    INDEX_HTML.replace("{{domain}}", &escape_html(domain))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Topic Relay - {{domain}}</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f5f5f5;
            color: #333;
            line-height: 1.6;
        }
        .container { max-width: 800px; margin: 0 auto; padding: 20px; }
        header {
            background: #2c3e50;
            color: white;
            padding: 20px;
            border-radius: 8px;
            margin-bottom: 20px;
        }
        header h1 { font-size: 22px; }
        header p { font-size: 14px; opacity: 0.8; }
        #messages {
            background: white;
            border-radius: 8px;
            padding: 20px;
            min-height: 400px;
            max-height: 60vh;
            overflow-y: auto;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .message { margin-bottom: 12px; padding: 10px 14px; border-radius: 8px; white-space: pre-wrap; }
        .message.user { background: #e3f2fd; margin-left: 20%; }
        .message.assistant { background: #f1f1f1; margin-right: 20%; }
        .message.error { background: #fdecea; color: #b71c1c; }
        form { display: flex; gap: 10px; margin-top: 20px; }
        input[type=text] { flex: 1; padding: 10px; border: 1px solid #ccc; border-radius: 6px; font-size: 15px; }
        button { padding: 10px 18px; border: none; border-radius: 6px; background: #2c3e50; color: white; cursor: pointer; }
        button.secondary { background: #95a5a6; }
        button:disabled { opacity: 0.5; cursor: default; }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>AI Chat: {{domain}}</h1>
            <p>This assistant only answers questions about {{domain}}.</p>
        </header>
        <div id="messages"></div>
        <form id="chat-form">
            <input type="text" id="message" placeholder="Type your question..." autocomplete="off">
            <button type="submit" id="send">Send</button>
            <button type="button" id="clear" class="secondary">Clear</button>
        </form>
    </div>
    <script>
        const messages = document.getElementById('messages');
        const form = document.getElementById('chat-form');
        const input = document.getElementById('message');
        const send = document.getElementById('send');

        function append(kind, text) {
            const div = document.createElement('div');
            div.className = 'message ' + kind;
            div.textContent = text;
            messages.appendChild(div);
            messages.scrollTop = messages.scrollHeight;
        }

        form.addEventListener('submit', async (e) => {
            e.preventDefault();
            const text = input.value.trim();
            if (!text) return;
            append('user', text);
            input.value = '';
            send.disabled = true;
            try {
                const res = await fetch('/chat', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ message: text })
                });
                const data = await res.json();
                if (res.ok) {
                    append('assistant', data.response);
                } else {
                    append('error', data.error || ('HTTP ' + res.status));
                }
            } catch (err) {
                append('error', String(err));
            } finally {
                send.disabled = false;
                input.focus();
            }
        });

        document.getElementById('clear').addEventListener('click', async () => {
            const res = await fetch('/clear', { method: 'POST' });
            if (res.ok) {
                messages.innerHTML = '';
            }
        });
    </script>
</body>
</html>
"#;
